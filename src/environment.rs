use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tera::{Context, Tera, Value};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::callable::{Call, Callable};
use crate::config::RendererOptions;
use crate::error::{BridgeError, Result};
use crate::extension::Extension;
use crate::lexer::Lexer;

/// What the extension registrar needs from a renderer.
pub trait Renderer {
    /// Attach an extension. Later registrations may replace earlier ones of the same name.
    fn add_extension(&mut self, extension: Arc<dyn Extension>) -> Result<()>;

    fn set_lexer(&mut self, lexer: Lexer);
}

/// Finds template files under a list of directories.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    paths: Vec<PathBuf>,
    extension: String,
}

impl TemplateLoader {
    pub fn new(paths: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            paths,
            extension: extension.into(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn suffix(&self) -> String {
        format!(".{}", self.extension)
    }

    /// Read every template as `(name, source)`.
    ///
    /// Names are paths relative to their directory, `/`-separated, without the
    /// template extension. When two directories hold the same name the first wins.
    pub fn load(&self) -> Result<Vec<(String, String)>> {
        let suffix = self.suffix();
        let mut seen = BTreeSet::new();
        let mut templates = Vec::new();

        for dir in &self.paths {
            if !dir.is_dir() {
                return Err(BridgeError::TemplateDirectoryMissing { path: dir.clone() });
            }

            for entry in WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let Some(name) = template_name(dir, entry.path(), &suffix) else {
                    continue;
                };
                if !seen.insert(name.clone()) {
                    debug!(
                        template = %name,
                        dir = %dir.display(),
                        "shadowed by an earlier path"
                    );
                    continue;
                }

                let source =
                    std::fs::read_to_string(entry.path()).map_err(|e| BridgeError::Io {
                        context: format!("reading {}", entry.path().display()),
                        source: e,
                    })?;
                templates.push((name, source));
            }
        }

        Ok(templates)
    }
}

fn template_name(dir: &Path, path: &Path, suffix: &str) -> Option<String> {
    let rel = path.strip_prefix(dir).ok()?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    joined.strip_suffix(suffix).map(str::to_string)
}

struct CallableFilter {
    callable: Callable,
    safe: bool,
}

impl tera::Filter for CallableFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        (self.callable)(Call {
            value: Some(value),
            args,
        })
    }

    fn is_safe(&self) -> bool {
        self.safe
    }
}

struct CallableFunction {
    callable: Callable,
    safe: bool,
}

impl tera::Function for CallableFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        (self.callable)(Call { value: None, args })
    }

    fn is_safe(&self) -> bool {
        self.safe
    }
}

struct CallableTest {
    callable: Callable,
}

impl tera::Test for CallableTest {
    fn test(&self, value: Option<&Value>, args: &[Value]) -> tera::Result<bool> {
        let args: HashMap<String, Value> = args
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect();
        let out = (self.callable)(Call { value, args: &args })?;
        Ok(truthy(&out))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A configured Tera instance plus the extensions and lexer attached to it.
pub struct Environment {
    tera: Tera,
    options: RendererOptions,
    loader: TemplateLoader,
    lexer: Option<Lexer>,
    extensions: Vec<Arc<dyn Extension>>,
    globals: Context,
}

impl Environment {
    pub fn new(loader: TemplateLoader, options: RendererOptions) -> Self {
        let mut tera = Tera::default();
        if !options.autoescape {
            tera.autoescape_on(Vec::new());
        }

        Self {
            tera,
            options,
            loader,
            lexer: None,
            extensions: Vec::new(),
            globals: Context::new(),
        }
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    /// The installed lexer; `None` until the build pipeline sets one.
    pub fn lexer(&self) -> Option<&Lexer> {
        self.lexer.as_ref()
    }

    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    pub fn extension_names(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(|e| e.name())
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extension_names().any(|n| n == name)
    }

    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }

    /// Rewrite a template into Tera syntax with the installed lexer.
    pub fn translate(&self, name: &str, source: &str) -> Result<String> {
        match &self.lexer {
            Some(lexer) => Ok(lexer.translate(name, source)?.into_owned()),
            None => Ok(source.to_string()),
        }
    }

    pub fn add_raw_template(&mut self, name: &str, source: &str) -> Result<()> {
        let source = self.translate(name, source)?;
        self.tera
            .add_raw_template(name, &source)
            .map_err(|e| BridgeError::TemplateError {
                name: name.to_string(),
                source: e,
            })
    }

    /// Load every template the loader finds. Returns how many were added.
    pub fn load_templates(&mut self) -> Result<usize> {
        let templates = self
            .loader
            .load()?
            .into_iter()
            .map(|(name, source)| {
                let source = self.translate(&name, &source)?;
                Ok((name, source))
            })
            .collect::<Result<Vec<_>>>()?;

        let count = templates.len();
        self.tera
            .add_raw_templates(templates)
            .map_err(|e| BridgeError::TemplateError {
                name: format!("{} templates", self.loader.extension()),
                source: e,
            })?;
        Ok(count)
    }

    /// Render a template by name; `page` and `page.tera` name the same template.
    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        let name = self.resolve_name(name);
        self.tera
            .render(name, &self.with_globals(context))
            .map_err(|e| BridgeError::RenderError {
                name: name.to_string(),
                source: e,
            })
    }

    /// Render a one-off template string, written with the configured delimiters.
    pub fn render_str(&mut self, source: &str, context: &Context) -> Result<String> {
        let translated = self.translate("__inline__", source)?;
        let context = self.with_globals(context);
        self.tera
            .render_str(&translated, &context)
            .map_err(|e| BridgeError::RenderError {
                name: "__inline__".to_string(),
                source: e,
            })
    }

    fn resolve_name<'n>(&self, name: &'n str) -> &'n str {
        if self.tera.get_template_names().any(|n| n == name) {
            return name;
        }
        name.strip_suffix(self.loader.suffix().as_str())
            .unwrap_or(name)
    }

    fn with_globals(&self, context: &Context) -> Context {
        let mut merged = self.globals.clone();
        merged.extend(context.clone());
        merged
    }
}

impl Renderer for Environment {
    fn add_extension(&mut self, extension: Arc<dyn Extension>) -> Result<()> {
        for r in extension.filters() {
            self.tera.register_filter(
                &r.name,
                CallableFilter {
                    callable: r.callable,
                    safe: r.safe,
                },
            );
        }
        for r in extension.functions() {
            self.tera.register_function(
                &r.name,
                CallableFunction {
                    callable: r.callable,
                    safe: r.safe,
                },
            );
        }
        for r in extension.tests() {
            self.tera
                .register_tester(&r.name, CallableTest { callable: r.callable });
        }
        for (key, value) in extension.globals() {
            if self.globals.contains_key(&key) {
                warn!(global = %key, extension = extension.name(), "global redefined");
            }
            self.globals.insert(key, &value);
        }

        debug!(extension = extension.name(), "extension added to renderer");
        self.extensions.push(extension);
        Ok(())
    }

    fn set_lexer(&mut self, lexer: Lexer) {
        self.lexer = Some(lexer);
    }
}
