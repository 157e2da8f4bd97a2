//! Search engine adapters

pub mod process;
pub mod http;
pub mod scripted;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;

use crate::engine::{EngineError, SearchEngine};

/// Where to find the engine, parsed from `kind:argument`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSpec {
    /// `process:<program> [args...]`
    Process { program: String, args: Vec<String> },
    /// `http:<base url>`
    Http { url: String },
    /// `scripted:<script file>`
    Scripted { path: PathBuf },
}

impl FromStr for EngineSpec {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = s
            .split_once(':')
            .ok_or_else(|| EngineError::Spec(format!("expected kind:argument, got `{}`", s)))?;
        let arg = arg.trim();
        if arg.is_empty() {
            return Err(EngineError::Spec(format!("missing argument for `{}` engine", kind)));
        }
        match kind {
            "process" => {
                let mut words = arg.split_whitespace().map(str::to_string);
                let program = words.next().unwrap_or_default();
                Ok(EngineSpec::Process {
                    program,
                    args: words.collect(),
                })
            }
            "http" => Ok(EngineSpec::Http {
                url: arg.to_string(),
            }),
            "scripted" => Ok(EngineSpec::Scripted {
                path: PathBuf::from(arg),
            }),
            other => Err(EngineError::Spec(format!("unknown engine kind: {}", other))),
        }
    }
}

/// Factory function to create search engines
pub fn create_engine(spec: &EngineSpec) -> Result<Arc<dyn SearchEngine>> {
    match spec {
        EngineSpec::Process { program, args } => {
            Ok(Arc::new(process::ProcessEngine::new(program.clone(), args.clone())))
        }
        EngineSpec::Http { url } => Ok(Arc::new(http::HttpEngine::new(url.clone()))),
        EngineSpec::Scripted { path } => Ok(Arc::new(scripted::ScriptedEngine::from_file(path)?)),
    }
}
