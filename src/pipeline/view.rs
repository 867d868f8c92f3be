//! Render instructions returned by steps that need user input

/// What the user sees while a run is suspended
#[derive(Debug, Clone, PartialEq)]
pub enum StepView {
    /// Render a form and wait for it to be posted back
    Form(FormView),
    /// Send the browser elsewhere (e.g. an OAuth authorize page)
    Redirect { url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub title: String,
    pub fields: Vec<FormField>,
    pub submit_label: String,
}

impl FormView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            submit_label: "Continue".to_string(),
        }
    }

    pub fn with_field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub help_text: Option<String>,
    pub input: FieldInput,
}

impl FormField {
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            help_text: None,
            input: FieldInput::Text { placeholder: None },
        }
    }

    pub fn choice(name: impl Into<String>, label: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            help_text: None,
            input: FieldInput::Choice { choices },
        }
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        if let FieldInput::Text { placeholder: slot } = &mut self.input {
            *slot = Some(placeholder.into());
        }
        self
    }

    /// Choices of a choice field; empty for text fields
    pub fn choices(&self) -> &[Choice] {
        match &self.input {
            FieldInput::Choice { choices } => choices,
            FieldInput::Text { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text {
            placeholder: Option<String>,
    },
    Choice {
        choices: Vec<Choice>,
    },
}

/// One selectable entry; the posted value is `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub name: String,
}
