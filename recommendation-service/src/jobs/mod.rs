pub mod vector_refresh;

pub use vector_refresh::{start_vector_refresh_job, VectorRefreshJob, VectorRefreshStats};
