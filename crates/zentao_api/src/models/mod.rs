mod bug;
pub mod lenient;
mod product;
mod user;

pub use bug::{AssigneePayload, Bug, BugAssignee, BugList};
pub use product::{Product, ProductList};
pub use user::{UserProfile, UserResponse};
