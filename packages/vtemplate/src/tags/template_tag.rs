//! `<vt:template name="...">`: a nested variable scope rendered in place.

use tracing::trace;

use super::{BindContext, CloneContext, TagBehavior};
use crate::error::ParseErrorKind;
use crate::template::ScopeId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTag {
    pub name: Option<String>,
    /// Set once the open tag has been processed.
    pub scope: Option<ScopeId>,
}

impl TagBehavior for TemplateTag {
    fn tag_name(&self) -> &'static str {
        "template"
    }

    fn on_adding_attribute(
        &mut self,
        _cx: &mut BindContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<(), ParseErrorKind> {
        if name == "name" {
            let value = value.trim();
            self.name = (!value.is_empty()).then(|| value.to_string());
        }
        Ok(())
    }

    fn process_begin_tag(
        &mut self,
        cx: &mut BindContext<'_>,
        closed: bool,
    ) -> Result<bool, ParseErrorKind> {
        self.scope = Some(cx.add_scope(self.name.clone()));
        Ok(!closed)
    }

    fn process_end_tag(&mut self, _cx: &mut BindContext<'_>) -> Result<(), ParseErrorKind> {
        trace!(template = ?self.name, "close template scope");
        Ok(())
    }

    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(TemplateTag {
            name: self.name.clone(),
            scope: Some(cx.add_scope(self.name.clone())),
        })
    }
}
