//! The board: tasks partitioned into status columns.
//!
//! Every column is kept sorted by descending priority; ties keep the order
//! in which tasks arrived (server order on load, newest first on create).
//! All mutations here are synchronous and never fail halfway, which is what
//! lets the reconciler apply a move before the service has seen it.
//!
//! Settled-state invariants:
//! - a task in column `C` has `status == C.as_str()`
//! - a task id appears in at most one column, at most once

use std::collections::HashSet;

use super::task::{Column, Task, TaskId};

/// Where a dragged task was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Directly onto a column.
    Column(Column),
    /// Onto another task; the destination is that task's column.
    Task(TaskId),
    /// Something that names neither a column nor a task.
    Unknown(String),
}

impl DropTarget {
    /// Interpret user input: a column name first, then a task id.
    pub fn parse(input: &str) -> DropTarget {
        if let Some(column) = Column::from_status(input).or_else(|| Column::parse_lenient(input)) {
            return DropTarget::Column(column);
        }
        match input.parse::<TaskId>() {
            Ok(id) => DropTarget::Task(id),
            Err(_) => DropTarget::Unknown(input.to_string()),
        }
    }
}

impl std::fmt::Display for DropTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropTarget::Column(c) => write!(f, "column '{}'", c),
            DropTarget::Task(id) => write!(f, "task #{}", id),
            DropTarget::Unknown(s) => write!(f, "'{}'", s),
        }
    }
}

/// A resolved cross-column move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub task: TaskId,
    pub from: Column,
    pub to: Column,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    columns: [Vec<Task>; 3],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition a full listing into columns.
    ///
    /// Tasks with an unknown status are dropped from view, as are repeated
    /// ids after their first occurrence.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut board = Self::new();
        let mut seen = HashSet::new();
        for task in tasks {
            let Some(column) = task.column() else {
                continue;
            };
            if seen.insert(task.id) {
                board.columns[column.index()].push(task);
            }
        }
        for column in board.columns.iter_mut() {
            sort_by_priority(column);
        }
        board
    }

    pub fn column(&self, column: Column) -> &[Task] {
        &self.columns[column.index()]
    }

    /// All tasks, column by column in display order.
    pub fn tasks(&self) -> impl Iterator<Item = (Column, &Task)> {
        Column::ALL
            .into_iter()
            .flat_map(move |c| self.column(c).iter().map(move |t| (c, t)))
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear search for a task's position.
    pub fn find(&self, id: TaskId) -> Option<(Column, usize)> {
        Column::ALL.into_iter().find_map(|c| {
            self.column(c)
                .iter()
                .position(|t| t.id == id)
                .map(|row| (c, row))
        })
    }

    pub fn column_of(&self, id: TaskId) -> Option<Column> {
        self.find(id).map(|(c, _)| c)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.find(id)
            .map(|(c, row)| &self.columns[c.index()][row])
    }

    /// Work out where a drop would move `active`.
    ///
    /// Returns `None` when the active task or the destination cannot be
    /// found, and when source and destination are the same column: columns
    /// are always priority-sorted, so reordering within one is meaningless.
    pub fn resolve_drop(&self, active: TaskId, over: &DropTarget) -> Option<Move> {
        let from = self.column_of(active)?;
        let to = match over {
            DropTarget::Column(c) => *c,
            DropTarget::Task(id) => self.column_of(*id)?,
            DropTarget::Unknown(_) => return None,
        };
        (from != to).then_some(Move {
            task: active,
            from,
            to,
        })
    }

    /// Apply a resolved move: take the task out of its column, retag its
    /// status, and insert it into the destination in priority order.
    ///
    /// Returns false, leaving the board untouched, if the task is no longer
    /// in `mv.from`.
    pub fn apply_move(&mut self, mv: Move) -> bool {
        let source = &mut self.columns[mv.from.index()];
        let Some(row) = source.iter().position(|t| t.id == mv.task) else {
            return false;
        };
        let mut task = source.remove(row);
        task.status = mv.to.as_str().to_string();

        let dest = &mut self.columns[mv.to.index()];
        dest.push(task);
        sort_by_priority(dest);
        true
    }

    /// Resolve and apply a drop in one step.
    pub fn drop_task(&mut self, active: TaskId, over: &DropTarget) -> Option<Move> {
        let mv = self.resolve_drop(active, over)?;
        self.apply_move(mv).then_some(mv)
    }

    /// Insert a task the service just created.
    ///
    /// The task goes in front of its column before the stable re-sort, so it
    /// leads among equal priorities. Returns the column, or `None` when its
    /// status is not a known column (the task is then not shown).
    pub fn insert_created(&mut self, task: Task) -> Option<Column> {
        let column = task.column()?;
        self.remove(task.id);
        let dest = &mut self.columns[column.index()];
        dest.insert(0, task);
        sort_by_priority(dest);
        Some(column)
    }

    /// Remove a task wherever it is.
    pub fn remove(&mut self, id: TaskId) -> Option<(Column, Task)> {
        let (column, row) = self.find(id)?;
        Some((column, self.columns[column.index()].remove(row)))
    }

    /// Check both settled-state invariants.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        self.tasks()
            .all(|(c, t)| t.status == c.as_str() && seen.insert(t.id))
    }

    /// Whether every column is in descending priority order.
    pub fn is_sorted(&self) -> bool {
        self.columns
            .iter()
            .all(|col| col.windows(2).all(|w| w[0].priority >= w[1].priority))
    }
}

fn sort_by_priority(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
}
