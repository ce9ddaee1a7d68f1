mod auth;
mod exams;
mod health_check;
mod subjects;
mod tasks;
mod users;

pub use auth::{login, refresh, register};
pub use exams::{create_exam, delete_exam, get_exam, list_exams, update_exam};
pub use health_check::health_check;
pub use subjects::{create_subject, delete_subject, get_subject, list_subjects, update_subject};
pub use tasks::{
    create_task, delete_task, get_task, list_tasks, update_task, update_task_status,
};
pub use users::get_current_user;
