use bytes::Bytes;

/// A fully validated `/generate` request. Only the validator constructs these.
#[derive(Debug, Clone)]
pub enum GenerateRequest {
    Audit {
        file: FileUpload,
        jd_text: Option<String>,
    },
    Refactor {
        file: FileUpload,
        jd_text: Option<String>,
        options: RefactorOptions,
    },
    Chat {
        messages: Vec<ChatMessage>,
    },
}

impl GenerateRequest {
    pub fn action(&self) -> Action {
        match self {
            GenerateRequest::Audit { .. } => Action::Audit,
            GenerateRequest::Refactor { .. } => Action::Refactor,
            GenerateRequest::Chat { .. } => Action::Chat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Audit,
    Refactor,
    Chat,
}

impl Action {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "audit" => Some(Action::Audit),
            "refactor" => Some(Action::Refactor),
            "chat" => Some(Action::Chat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Audit => "audit",
            Action::Refactor => "refactor",
            Action::Chat => "chat",
        }
    }
}

/// Uploaded resume, already decoded from base64.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: Option<String>,
    pub mime_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CareerLevel {
    Junior,
    Mid,
    Senior,
    Staff,
}

impl CareerLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "junior" => Some(CareerLevel::Junior),
            "mid" => Some(CareerLevel::Mid),
            "senior" => Some(CareerLevel::Senior),
            "staff" => Some(CareerLevel::Staff),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CareerLevel::Junior => "junior",
            CareerLevel::Mid => "mid",
            CareerLevel::Senior => "senior",
            CareerLevel::Staff => "staff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefactorOptions {
    pub level: CareerLevel,
    /// How strongly the rewrite leans toward the job description, 0 to 100.
    pub jd_alignment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(ChatRole::User),
            "model" => Some(ChatRole::Model),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}
