//! Variable declarations and interpolation for Packer templates.
//!
//! Supports references like:
//! - `${var.NAME}` - Declared variable; its default when it has one, otherwise
//!   the runtime placeholder `${NAME}` (upper-cased)
//! - `${path.root}` / `${path.cwd}` - The template directory, as `${TEMPLATE_DIR}`
//!
//! References to undeclared variables are left untouched. Templates are
//! parsed with [`hcl::Template`], so `$${...}` escapes come out as literal
//! `${...}` text and are never substituted.

use hcl::Body;
use hcl::expr::{Expression, TemplateExpr, Traversal, TraversalOperator};
use hcl::template::{Element, Template};
use packport_core::template::Variable;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::decoder::BlockDecoder;
use crate::loader::load_body;
use crate::{ConfigResult, FileRole};

/// Placeholder substituted for `path.root` and `path.cwd`.
pub const TEMPLATE_DIR_PLACEHOLDER: &str = "${TEMPLATE_DIR}";

/// Table of declared variables, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: HashMap<String, Variable>,
}

impl VariableTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `variable` block from a variables file.
    ///
    /// An empty file yields no variables.
    pub fn parse_file(&mut self, path: &Path) -> ConfigResult<()> {
        let body = load_body(path, FileRole::Variables)?;
        self.load_body(&body);
        debug!(path = %path.display(), count = self.variables.len(), "Loaded variables");
        Ok(())
    }

    /// Load every top-level `variable` block from a parsed body.
    ///
    /// Blocks without a label are skipped. A later declaration of the same
    /// name replaces an earlier one.
    pub fn load_body(&mut self, body: &Body) {
        // Defaults are literals; they never reference other variables.
        let empty = VariableTable::new();

        for block in body.blocks().filter(|b| b.identifier() == "variable") {
            let Some(label) = block.labels().first() else {
                continue;
            };
            let name = label.as_str().to_string();
            let decoder = BlockDecoder::new(block.body(), &empty);

            let declared_type = decoder
                .expression("type")
                .map(|expr| expr.to_string())
                .unwrap_or_default();
            let default = decoder.value("default").and_then(|v| v.as_string());

            self.variables.insert(
                name.clone(),
                Variable {
                    name,
                    declared_type,
                    default,
                },
            );
        }
    }

    /// Look up a declared variable.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// All declared variables.
    pub fn all(&self) -> &HashMap<String, Variable> {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Default value of a declared variable, if it has one.
    pub fn default_value(&self, name: &str) -> Option<&str> {
        self.variables.get(name)?.default.as_deref()
    }

    /// Resolve `namespace.name` to its substituted value.
    pub fn resolve(&self, namespace: &str, name: &str) -> Option<String> {
        match namespace {
            "var" => {
                let variable = self.variables.get(name)?;
                Some(
                    variable
                        .default
                        .clone()
                        .unwrap_or_else(|| runtime_placeholder(name)),
                )
            }
            "path" if name == "root" || name == "cwd" => {
                Some(TEMPLATE_DIR_PLACEHOLDER.to_string())
            }
            _ => None,
        }
    }

    /// Resolve a `var.x` / `path.x` traversal.
    pub fn resolve_traversal(&self, traversal: &Traversal) -> Option<String> {
        match (&traversal.expr, traversal.operators.as_slice()) {
            (Expression::Variable(root), [TraversalOperator::GetAttr(attr)]) => {
                self.resolve(root.as_str(), attr.as_str())
            }
            _ => None,
        }
    }

    /// Render a quoted or heredoc template, substituting known references.
    ///
    /// Interpolations that cannot be resolved and directives are written back
    /// as HCL text.
    pub fn render_template(&self, template: &TemplateExpr) -> String {
        match Template::from_expr(template) {
            Ok(parsed) => self.render_elements(parsed.elements()),
            Err(err) => {
                warn!(error = %err, "Failed to parse template, keeping raw text");
                template.to_string()
            }
        }
    }

    fn render_elements(&self, elements: &[Element]) -> String {
        let mut out = String::new();
        for element in elements {
            match element {
                Element::Literal(text) => out.push_str(text),
                Element::Interpolation(interpolation) => {
                    match self.resolve_interpolation(&interpolation.expr) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&format!("${{{}}}", interpolation.expr)),
                    }
                }
                Element::Directive(directive) => {
                    let directive = Template::from_iter([Element::Directive(directive.clone())]);
                    out.push_str(&directive.to_string());
                }
            }
        }
        out
    }

    fn resolve_interpolation(&self, expr: &Expression) -> Option<String> {
        match expr {
            Expression::Traversal(traversal) => self.resolve_traversal(traversal),
            Expression::String(s) => Some(s.clone()),
            Expression::Number(n) => Some(n.to_string()),
            Expression::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// `${NAME}` placeholder for a variable supplied at build time.
pub fn runtime_placeholder(name: &str) -> String {
    format!("${{{}}}", name.to_uppercase().replace('-', "_"))
}
