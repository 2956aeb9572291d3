//! Per-language scope policies.

mod go;
mod java;
mod javascript;
mod python;
mod typescript;

pub use go::GoPolicy;
pub use java::JavaPolicy;
pub use javascript::JavaScriptPolicy;
pub use python::PythonPolicy;
pub use typescript::TypeScriptPolicy;

use super::policy::ScopePolicy;
use crate::analysis::Language;

static PYTHON_POLICY: PythonPolicy = PythonPolicy;
static JAVASCRIPT_POLICY: JavaScriptPolicy = JavaScriptPolicy;
static TYPESCRIPT_POLICY: TypeScriptPolicy = TypeScriptPolicy;
static GO_POLICY: GoPolicy = GoPolicy;
static JAVA_POLICY: JavaPolicy = JavaPolicy;

/// The scope policy for a language. TSX shares the TypeScript policy.
pub fn policy_for(language: Language) -> &'static dyn ScopePolicy {
    match language {
        Language::Python => &PYTHON_POLICY,
        Language::JavaScript => &JAVASCRIPT_POLICY,
        Language::TypeScript | Language::Tsx => &TYPESCRIPT_POLICY,
        Language::Go => &GO_POLICY,
        Language::Java => &JAVA_POLICY,
    }
}
