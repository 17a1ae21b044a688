pub mod id;
pub mod paths;

pub use id::{new_id, ChatId, MessageId, ModelId, TaskId};
pub use paths::{data_dir, ensure_dirs, models_dir, store_file, PathError};
