use std::sync::Arc;

use crate::draft::FormDraft;
use crate::error::FormError;
use crate::spec::form::Form;

/// Draft editing with save, restore and publish.
///
/// Publishing freezes the draft into a shared [`Form`] and locks editing
/// until [`Designer::unpublish`] is called.
#[derive(Debug, Clone, Default)]
pub struct Designer {
    draft: FormDraft,
    saved: Option<Form>,
    published: Option<Arc<Form>>,
}

impl Designer {
    pub fn new(draft: FormDraft) -> Self {
        Self {
            draft,
            saved: None,
            published: None,
        }
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn is_locked(&self) -> bool {
        self.published.is_some()
    }

    pub fn has_saved_draft(&self) -> bool {
        self.saved.is_some()
    }

    /// Runs `edit` against the draft unless the form is published.
    pub fn edit<T>(
        &mut self,
        edit: impl FnOnce(&mut FormDraft) -> Result<T, FormError>,
    ) -> Result<T, FormError> {
        if self.is_locked() {
            return Err(FormError::Locked);
        }
        edit(&mut self.draft)
    }

    pub fn save(&mut self) -> &Form {
        self.saved.insert(self.draft.publish())
    }

    /// Replaces the draft with the last saved snapshot.
    pub fn restore_draft(&mut self) -> Result<(), FormError> {
        if self.is_locked() {
            return Err(FormError::Locked);
        }
        let saved = self.saved.as_ref().ok_or(FormError::NoSavedDraft)?;
        self.draft = FormDraft::from_form(saved)?;
        Ok(())
    }

    pub fn publish(&mut self) -> Arc<Form> {
        let form = Arc::new(self.draft.publish());
        self.published = Some(Arc::clone(&form));
        form
    }

    pub fn published(&self) -> Option<Arc<Form>> {
        self.published.clone()
    }

    pub fn unpublish(&mut self) {
        self.published = None;
    }
}
