/// Whatever could be read about the person behind a posting. Both fields
/// missing is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecruiterInfo {
    pub name: Option<String>,
    /// An email address or a social-profile URL.
    pub contact: Option<String>,
}

impl RecruiterInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.contact.is_none()
    }

    /// Name to greet in outreach.
    pub fn salutation(&self) -> &str {
        self.name.as_deref().unwrap_or("Hiring Team")
    }
}
