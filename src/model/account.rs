/// Credentials held by the identity adapter, one per employee profile.
#[derive(Debug, Clone)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
}
