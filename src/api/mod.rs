pub mod site_client;
pub mod urls;

pub use site_client::{PageSource, SiteClient};
pub use urls::SiteUrls;
