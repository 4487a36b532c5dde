mod comment_repository;
mod follow_repository;
mod like_repository;
mod post_repository;
mod user_repository;

pub use comment_repository::CommentRepository;
pub use follow_repository::FollowRepository;
pub use like_repository::LikeRepository;
pub use post_repository::PostRepository;
pub use user_repository::{UserCredentials, UserRepository};
