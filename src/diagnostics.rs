use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        hint_for_code(self.code)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = self.source() {
            write!(f, "{}: ", source)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(hint) = self.hint() {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

pub fn hint_for_code(code: &str) -> Option<&'static str> {
    match code {
        "E-IO" => Some("check the configured paths and file permissions."),
        "E-CONFIG" => Some("run `roundtrip init` for a template configuration."),
        "E-XFAIL-TABLE" => Some("every entry needs a unique, non-empty id and a failure code."),
        "E-UNEXPECTED-FAIL" => {
            Some("fix the regression, or record the case in the xfail table with its cause.")
        }
        "E-WRONG-CAUSE" => Some("the known defect changed shape; update the recorded cause."),
        "E-UNEXPECTED-PASS" => Some("the case is fixed; remove its xfail entry."),
        _ => None,
    }
}
