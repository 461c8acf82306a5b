//! Email threads and replies: models and persistence.

mod model;
mod repository;

pub use model::{
    CustomerId, EmailReply, EmailThread, NewReply, NewThread, Page, ReplyId, ThreadId,
    ThreadStats, ThreadStatus, ThreadWithReplies,
};
pub use repository::ThreadRepository;
