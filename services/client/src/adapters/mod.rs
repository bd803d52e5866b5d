pub mod admin;
pub mod lessons;
pub mod payment;
pub(crate) mod records;
pub mod rest;
pub mod users;

pub use admin::HttpAdminAdapter;
pub use lessons::HttpLessonAdapter;
pub use payment::HttpPaymentAdapter;
pub use rest::RestClient;
pub use users::HttpUserAdapter;
