//! The task repository.
//!
//! `TaskRepository` owns the task and project collections behind a single
//! mutex. Every operation, read or write, takes that lock. Mutations write
//! the affected file while still holding it, so the on-disk order matches
//! the order mutations were applied.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{now_iso, Analytics, ImportPayload, Snapshot, Task, TaskInput, DEFAULT_PROJECT};
use crate::storage::{self, PROJECTS_FILE, TASKS_FILE};

/// Result of a mutation together with whether it reached disk.
///
/// A failed write never rolls back the in-memory change; `durable` is how
/// callers find out that the two have diverged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub durable: bool,
}

#[derive(Debug, Default)]
struct Board {
    tasks: Vec<Task>,
    projects: Vec<String>,
}

#[derive(Debug)]
pub struct TaskRepository {
    board: Mutex<Board>,
    data_dir: Option<PathBuf>,
}

impl TaskRepository {
    /// Repository that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            board: Mutex::new(Board {
                tasks: Vec::new(),
                projects: vec![DEFAULT_PROJECT.to_string()],
            }),
            data_dir: None,
        }
    }

    /// Load `tasks.json` and `projects.json` from `data_dir`, creating the
    /// directory if needed. Missing or unreadable files start empty.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let tasks: Vec<Task> = storage::load(&data_dir.join(TASKS_FILE)).unwrap_or_default();
        let mut projects: Vec<String> =
            storage::load(&data_dir.join(PROJECTS_FILE)).unwrap_or_default();
        if projects.is_empty() {
            projects.push(DEFAULT_PROJECT.to_string());
        }
        tracing::info!(
            "Loaded {} tasks and {} projects from {}",
            tasks.len(),
            projects.len(),
            data_dir.display()
        );

        Ok(Self {
            board: Mutex::new(Board { tasks, projects }),
            data_dir: Some(data_dir),
        })
    }

    pub fn list(&self, project: Option<&str>) -> Vec<Task> {
        let board = self.lock();
        match project {
            Some(project) => board
                .tasks
                .iter()
                .filter(|task| task.project == project)
                .cloned()
                .collect(),
            None => board.tasks.clone(),
        }
    }

    pub fn get(&self, id: &str) -> Result<Task> {
        let board = self.lock();
        board
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub fn create(&self, input: TaskInput) -> Result<Committed<Task>> {
        let mut board = self.lock();
        let task = normalize(input, &board.tasks)?;
        board.tasks.push(task.clone());
        let durable = self.persist_tasks(&board);
        Ok(Committed {
            value: task,
            durable,
        })
    }

    /// Apply `input` to the task with `id`.
    ///
    /// `title` and `project` are only replaced when present. `done`,
    /// `priority` and `due` are always replaced, falling back to `false`,
    /// `0` and no due date.
    pub fn update(&self, id: &str, input: TaskInput) -> Result<Committed<Task>> {
        let mut board = self.lock();
        let title = input.title.as_deref().map(clean_title).transpose()?;
        let task = board
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(project) = input.project {
            task.project = project;
        }
        task.done = input.done.unwrap_or(false);
        task.priority = input.priority.unwrap_or(0);
        task.due = input.due;
        let task = task.clone();
        let durable = self.persist_tasks(&board);
        Ok(Committed {
            value: task,
            durable,
        })
    }

    pub fn delete(&self, id: &str) -> Result<Committed<()>> {
        let mut board = self.lock();
        let before = board.tasks.len();
        board.tasks.retain(|task| task.id != id);
        if board.tasks.len() == before {
            return Err(not_found(id));
        }
        let durable = self.persist_tasks(&board);
        Ok(Committed {
            value: (),
            durable,
        })
    }

    /// Remove every task, or only those in `project`. Returns how many went.
    pub fn clear(&self, project: Option<&str>) -> Committed<usize> {
        let mut board = self.lock();
        let before = board.tasks.len();
        match project {
            Some(project) => board.tasks.retain(|task| task.project != project),
            None => board.tasks.clear(),
        }
        let removed = before - board.tasks.len();
        let durable = self.persist_tasks(&board);
        Committed {
            value: removed,
            durable,
        }
    }

    pub fn projects(&self) -> Vec<String> {
        self.lock().projects.clone()
    }

    pub fn add_project(&self, name: &str) -> Result<Committed<Vec<String>>> {
        let mut board = self.lock();
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyProjectName);
        }
        if board.projects.iter().any(|p| p == name) {
            return Err(StoreError::DuplicateProject {
                name: name.to_string(),
            });
        }
        board.projects.push(name.to_string());
        let durable = self.persist_projects(&board);
        Ok(Committed {
            value: board.projects.clone(),
            durable,
        })
    }

    /// Counts over the full task set, regardless of project.
    pub fn analytics(&self) -> Analytics {
        Analytics::from_tasks(&self.lock().tasks)
    }

    pub fn export(&self) -> Snapshot {
        let board = self.lock();
        Snapshot {
            tasks: board.tasks.clone(),
            projects: board.projects.clone(),
        }
    }

    /// Replace all tasks, and the project list when the payload carries one.
    /// Nothing changes unless every imported task is valid. Imported project
    /// names go through the same cleanup as `add_project`, and `Inbox` is
    /// always kept.
    pub fn import(&self, payload: ImportPayload) -> Result<Committed<Snapshot>> {
        let mut board = self.lock();
        let mut tasks: Vec<Task> = Vec::with_capacity(payload.tasks.len());
        for input in payload.tasks {
            let task = normalize(input, &tasks)?;
            tasks.push(task);
        }
        board.tasks = tasks;
        if let Some(projects) = payload.projects {
            board.projects = clean_projects(projects);
        }
        let durable = self.persist_tasks(&board) & self.persist_projects(&board);
        tracing::info!(
            "Imported {} tasks and {} projects",
            board.tasks.len(),
            board.projects.len()
        );
        Ok(Committed {
            value: Snapshot {
                tasks: board.tasks.clone(),
                projects: board.projects.clone(),
            },
            durable,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_tasks(&self, board: &Board) -> bool {
        self.persist(TASKS_FILE, &board.tasks)
    }

    fn persist_projects(&self, board: &Board) -> bool {
        self.persist(PROJECTS_FILE, &board.projects)
    }

    fn persist<T: serde::Serialize>(&self, file: &str, value: &[T]) -> bool {
        let Some(dir) = &self.data_dir else {
            return true;
        };
        let path = dir.join(file);
        match storage::save(&path, value) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Failed to persist {}: {}", path.display(), err);
                false
            }
        }
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound { id: id.to_string() }
}

/// Trim names, drop blanks and repeats (first one wins), and put the
/// default project in front when it is missing.
fn clean_projects(raw: Vec<String>) -> Vec<String> {
    let mut projects: Vec<String> = Vec::with_capacity(raw.len() + 1);
    for name in raw {
        let name = name.trim();
        if !name.is_empty() && !projects.iter().any(|p| p == name) {
            projects.push(name.to_string());
        }
    }
    if !projects.iter().any(|p| p == DEFAULT_PROJECT) {
        projects.insert(0, DEFAULT_PROJECT.to_string());
    }
    projects
}

fn clean_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(StoreError::EmptyTitle);
    }
    Ok(title.to_string())
}

/// Build a stored task from an incoming payload, filling server-owned
/// defaults. `existing` is the collection the task will join.
fn normalize(input: TaskInput, existing: &[Task]) -> Result<Task> {
    let title = clean_title(input.title.as_deref().unwrap_or_default())?;
    let id = match input.id.filter(|id| !id.is_empty()) {
        Some(id) if existing.iter().any(|task| task.id == id) => {
            return Err(StoreError::DuplicateId { id });
        }
        Some(id) => id,
        None => unique_id(existing),
    };
    let created_at = input
        .created_at
        .filter(|stamp| !stamp.is_empty())
        .unwrap_or_else(now_iso);
    Ok(Task {
        id,
        title,
        done: input.done.unwrap_or(false),
        project: input
            .project
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        priority: input.priority.unwrap_or(0),
        due: input.due,
        created_at: Some(created_at),
    })
}

fn unique_id(existing: &[Task]) -> String {
    loop {
        let candidate = Uuid::new_v4().to_string();
        if !existing.iter().any(|task| task.id == candidate) {
            return candidate;
        }
    }
}
