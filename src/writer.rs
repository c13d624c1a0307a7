//! Code Writer
//!
//! Indentation- and scope-tracking text emitter. Scopes are closed either
//! explicitly with [`CodeWriter::end_block`] or all at once by
//! [`CodeWriter::finish`], which consumes the writer.

use crate::types::TypeIdentity;

const INDENT: &str = "    ";

pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    /// Write the `using` directives and open the namespace scope.
    pub fn new(namespace: &str, usings: &[String]) -> Self {
        let mut writer = Self {
            out: String::new(),
            depth: 0,
        };
        for using in usings {
            writer.write_line(&format!("using {};", using));
        }
        if !usings.is_empty() {
            writer.write_blank();
        }
        writer.begin_block(&format!("namespace {}", namespace));
        writer
    }

    pub fn write_line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn write_blank(&mut self) {
        self.out.push('\n');
    }

    pub fn begin_block(&mut self, header: &str) {
        self.write_line(header);
        self.write_line("{");
        self.depth += 1;
    }

    /// Close the innermost scope, appending `trailing` after the brace
    /// (e.g. `);` for an object initializer passed as an argument).
    pub fn end_block(&mut self, trailing: Option<&str>) {
        self.depth = self.depth.saturating_sub(1);
        match trailing {
            Some(trailing) => self.write_line(&format!("}}{}", trailing)),
            None => self.write_line("}"),
        }
    }

    /// Run `body` inside a scope. The scope is closed whether or not `body`
    /// fails.
    pub fn block<T, E>(
        &mut self,
        header: &str,
        body: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        self.begin_block(header);
        let result = body(self);
        self.end_block(None);
        result
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Close every open scope and return the text.
    pub fn finish(mut self) -> String {
        while self.depth > 0 {
            self.end_block(None);
        }
        self.out
    }
}

/// Renders type names for emitted code: the simple name when its namespace is
/// imported by a `using` directive, otherwise fully qualified.
#[derive(Debug, Clone)]
pub struct TypeNamer {
    usings: Vec<String>,
}

impl TypeNamer {
    pub fn new(usings: Vec<String>) -> Self {
        Self { usings }
    }

    pub fn render(&self, identity: &TypeIdentity) -> String {
        if identity.namespace.is_empty() || self.usings.iter().any(|u| *u == identity.namespace) {
            identity.name.clone()
        } else {
            identity.qualified()
        }
    }
}
