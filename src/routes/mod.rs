mod health_check;
mod jwt;
mod urls;

pub use health_check::health_check;
pub use jwt::{check, delete_user, login, logout, refresh, register};
pub use jwt::{CheckTokenJson, UserDelete, UserJson};
pub use urls::{create_url, delete_url, get_url, update_url};
pub use urls::{UrlJson, UrlResponse};
