//! Tool-call accumulation for streamed LLM responses.
//!
//! A streamed completion delivers each tool call as a sequence of fragments
//! spread over many chunks. `ToolCallAccumulator` folds those fragments into
//! one complete record by pure concatenation.

/// Accumulated state of one tool call, built up while its fragments arrive.
///
/// The `id` is fixed by the first non-empty value and never replaced;
/// `name` and `arguments` grow by appending each fragment's partial text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallAccumulator {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallAccumulator {
    /// Fold one fragment's fields into this record. Absent fields contribute
    /// nothing.
    pub fn absorb(&mut self, id: Option<&str>, name: Option<&str>, arguments: Option<&str>) {
        if self.id.is_empty()
            && let Some(id) = id
        {
            self.id.push_str(id);
        }
        if let Some(name) = name {
            self.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            self.arguments.push_str(arguments);
        }
    }

    /// True once the record carries enough to dispatch: a non-empty name.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_concatenates_name_and_arguments() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(Some("call_1"), Some("plan_"), Some("{\"targets\""));
        acc.absorb(None, Some("observation"), Some(": [\"25544\"]}"));
        assert_eq!(acc.id, "call_1");
        assert_eq!(acc.name, "plan_observation");
        assert_eq!(acc.arguments, "{\"targets\": [\"25544\"]}");
    }

    #[test]
    fn test_id_set_once() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(Some("call_a"), None, None);
        acc.absorb(Some("call_b"), None, None);
        assert_eq!(acc.id, "call_a");
    }

    #[test]
    fn test_absent_fields_are_noops() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(None, None, None);
        assert_eq!(acc, ToolCallAccumulator::default());
        assert!(!acc.is_complete());
    }
}
