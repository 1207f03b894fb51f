pub mod history_status;
pub mod job_history;
pub mod job_status;
pub mod scheduled_job;
