pub mod category;
pub mod comment;
pub mod entry;
pub mod user;

pub use category::Category;
pub use comment::{Comment, CommentDraft, CommentError};
pub use entry::{Entry, NewEntry};
pub use user::User;
