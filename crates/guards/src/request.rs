use serde_json::Value;

/// Host tool operations the hook knows how to inspect. Unknown names are
/// carried through untouched so future host tools pass cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    Bash,
    Write,
    Edit,
    MultiEdit,
    Other(String),
}

impl ToolKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Bash" => ToolKind::Bash,
            "Write" => ToolKind::Write,
            "Edit" => ToolKind::Edit,
            "MultiEdit" => ToolKind::MultiEdit,
            other => ToolKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ToolKind::Bash => "Bash",
            ToolKind::Write => "Write",
            ToolKind::Edit => "Edit",
            ToolKind::MultiEdit => "MultiEdit",
            ToolKind::Other(name) => name,
        }
    }

    pub fn is_file_tool(&self) -> bool {
        matches!(self, ToolKind::Write | ToolKind::Edit | ToolKind::MultiEdit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOp {
    pub old_string: String,
    pub new_string: String,
}

/// Normalized, immutable form of one intercepted tool call. Derived fields
/// are extracted mechanically per tool kind; anything absent is empty.
#[derive(Debug, Clone)]
pub struct Request {
    pub tool: ToolKind,
    pub tool_input: Value,
    pub command: String,
    pub file_path: String,
    pub content: String,
    pub old_string: String,
    pub new_string: String,
    pub edits: Vec<EditOp>,
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("No input data provided")]
    Empty,
    #[error("Invalid JSON input: {0}")]
    InvalidJson(String),
    #[error("Input must be a JSON object")]
    NotObject,
    #[error("Missing required field: tool_name or tool")]
    MissingToolName,
}

/// Parse and normalize one hook invocation from raw JSON text. Accepts the
/// legacy aliases `tool`, `toolInput`, and `parameters`.
pub fn normalize(input: &str) -> Result<Request, InputError> {
    if input.trim().is_empty() {
        return Err(InputError::Empty);
    }
    let value: Value =
        serde_json::from_str(input).map_err(|e| InputError::InvalidJson(e.to_string()))?;
    let obj = value.as_object().ok_or(InputError::NotObject)?;

    let tool_name = obj
        .get("tool_name")
        .or_else(|| obj.get("tool"))
        .and_then(|v| v.as_str())
        .ok_or(InputError::MissingToolName)?;

    let tool_input = obj
        .get("tool_input")
        .or_else(|| obj.get("toolInput"))
        .or_else(|| obj.get("parameters"))
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    let tool = ToolKind::from_name(tool_name);
    Ok(derive_fields(tool, tool_input))
}

fn str_field(input: &Value, key: &str) -> String {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn derive_fields(tool: ToolKind, tool_input: Value) -> Request {
    let mut request = Request {
        tool,
        command: String::new(),
        file_path: String::new(),
        content: String::new(),
        old_string: String::new(),
        new_string: String::new(),
        edits: Vec::new(),
        tool_input,
    };

    match request.tool {
        ToolKind::Bash => {
            request.command = str_field(&request.tool_input, "command");
        }
        ToolKind::Write => {
            request.file_path = str_field(&request.tool_input, "file_path");
            request.content = str_field(&request.tool_input, "content");
        }
        ToolKind::Edit => {
            request.file_path = str_field(&request.tool_input, "file_path");
            request.old_string = str_field(&request.tool_input, "old_string");
            request.new_string = str_field(&request.tool_input, "new_string");
        }
        ToolKind::MultiEdit => {
            request.file_path = str_field(&request.tool_input, "file_path");
            if let Some(edits) = request.tool_input.get("edits").and_then(|v| v.as_array()) {
                request.edits = edits
                    .iter()
                    .map(|e| EditOp {
                        old_string: str_field(e, "old_string"),
                        new_string: str_field(e, "new_string"),
                    })
                    .collect();
            }
        }
        ToolKind::Other(_) => {}
    }

    request
}

impl Request {
    /// The text a file-mutating call is about to introduce: the full body for
    /// a write, the replacement for an edit, and the newline-joined
    /// replacements for a multi-edit. Joining with a newline preserves
    /// per-edit isolation for line-anchored patterns.
    pub fn incoming_text(&self) -> String {
        match self.tool {
            ToolKind::Write => self.content.clone(),
            ToolKind::Edit => self.new_string.clone(),
            ToolKind::MultiEdit => self
                .edits
                .iter()
                .map(|e| e.new_string.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bash_request() {
        let req = normalize(r#"{"tool_name":"Bash","tool_input":{"command":"ls -la"}}"#).unwrap();
        assert_eq!(req.tool, ToolKind::Bash);
        assert_eq!(req.command, "ls -la");
        assert!(req.file_path.is_empty());
    }

    #[test]
    fn accepts_legacy_tool_alias() {
        let req = normalize(r#"{"tool":"Write","toolInput":{"file_path":"/a.py","content":"x"}}"#)
            .unwrap();
        assert_eq!(req.tool, ToolKind::Write);
        assert_eq!(req.file_path, "/a.py");
        assert_eq!(req.content, "x");
    }

    #[test]
    fn accepts_parameters_alias() {
        let req =
            normalize(r#"{"tool_name":"Edit","parameters":{"file_path":"/a.py","new_string":"b"}}"#)
                .unwrap();
        assert_eq!(req.new_string, "b");
    }

    #[test]
    fn missing_tool_input_defaults_to_empty_object() {
        let req = normalize(r#"{"tool_name":"Bash"}"#).unwrap();
        assert!(req.command.is_empty());
        assert!(req.tool_input.is_object());
    }

    #[test]
    fn multi_edit_collects_ordered_edits() {
        let req = normalize(
            r#"{"tool_name":"MultiEdit","tool_input":{"file_path":"/a.py","edits":[
                {"old_string":"a","new_string":"b"},
                {"old_string":"c","new_string":"d"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(req.edits.len(), 2);
        assert_eq!(req.edits[1].new_string, "d");
        assert_eq!(req.incoming_text(), "b\nd");
    }

    #[test]
    fn unknown_tool_is_tolerated() {
        let req = normalize(r#"{"tool_name":"Glob","tool_input":{"pattern":"**/*.rs"}}"#).unwrap();
        assert_eq!(req.tool, ToolKind::Other("Glob".to_string()));
        assert!(req.incoming_text().is_empty());
    }

    #[test]
    fn empty_input_is_distinct_error() {
        assert!(matches!(normalize("   "), Err(InputError::Empty)));
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(matches!(normalize("[1,2]"), Err(InputError::NotObject)));
        assert!(matches!(normalize("42"), Err(InputError::NotObject)));
    }

    #[test]
    fn missing_tool_name_is_rejected() {
        assert!(matches!(
            normalize(r#"{"tool_input":{}}"#),
            Err(InputError::MissingToolName)
        ));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            normalize("{not json"),
            Err(InputError::InvalidJson(_))
        ));
    }
}
