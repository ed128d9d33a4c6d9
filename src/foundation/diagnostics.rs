/// Category of a degraded rendering step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum DiagnosticKind {
    /// An IRI did not resolve to any node.
    MissingReference,
    /// An IRI resolved to a node that is already being drawn further up the stack.
    CyclicReference,
    /// An IRI resolved to a node of an unexpected kind.
    WrongReferenceKind,
    /// An offscreen target could not be allocated; the effect was skipped.
    AllocationFailed,
    /// A transform needed for an inversion was singular.
    SingularTransform,
    /// The filter collaborator failed; the unfiltered layer was used.
    FilterFailed,
    /// A value was present but could not be honored.
    Unsupported,
}

/// One structured warning produced while rendering.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// The `id` of the node being drawn, when it has one.
    pub node: Option<String>,
    /// Human readable detail.
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(kind: DiagnosticKind, node: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            node: node.map(str::to_owned),
            message: message.into(),
        }
    }
}
