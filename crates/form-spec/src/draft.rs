//! Editable form definition.
//!
//! Fields and sections live in flat maps keyed by id; sections keep the
//! ordered list of their field ids. Lookups and edits by id never walk the
//! tree, and [`FormDraft::publish`] rebuilds the nested [`Form`].

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::error::FormError;
use crate::spec::api::ApiConfig;
use crate::spec::field::{Dependency, Field, FieldKind};
use crate::spec::form::{Form, Section};
use crate::spec::option::FieldOption;

const MAX_SECTION_COLUMNS: u8 = 4;

#[derive(Debug, Clone)]
struct SectionNode {
    label: String,
    description: Option<String>,
    columns: u8,
    field_ids: Vec<String>,
}

#[derive(Debug, Clone)]
struct FieldNode {
    section_id: String,
    field: Field,
}

#[derive(Debug, Clone, Default)]
pub struct FormDraft {
    section_order: Vec<String>,
    sections: HashMap<String, SectionNode>,
    fields: HashMap<String, FieldNode>,
}

impl FormDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_form(form: &Form) -> Result<Self, FormError> {
        let mut draft = Self::new();
        for section in &form.sections {
            draft.insert_section(section.clone())?;
        }
        Ok(draft)
    }

    /// Nested, serializable snapshot of the draft.
    pub fn publish(&self) -> Form {
        let sections = self
            .section_order
            .iter()
            .filter_map(|id| self.sections.get(id).map(|node| (id, node)))
            .map(|(id, node)| Section {
                id: id.clone(),
                label: node.label.clone(),
                description: node.description.clone(),
                columns: node.columns,
                fields: node
                    .field_ids
                    .iter()
                    .filter_map(|field_id| self.fields.get(field_id))
                    .map(|field_node| field_node.field.clone())
                    .collect(),
            })
            .collect();
        Form::new(sections)
    }

    // -- sections --------------------------------------------------------

    /// Appends an empty section and returns its generated id.
    pub fn add_section(&mut self, label: impl Into<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.section_order.push(id.clone());
        self.sections.insert(
            id.clone(),
            SectionNode {
                label: label.into(),
                description: None,
                columns: 1,
                field_ids: Vec::new(),
            },
        );
        id
    }

    /// Appends a complete section, fields included.
    pub fn insert_section(&mut self, section: Section) -> Result<(), FormError> {
        if self.sections.contains_key(&section.id) {
            return Err(FormError::DuplicateSection(section.id));
        }
        let mut seen = HashSet::new();
        for field in &section.fields {
            if self.fields.contains_key(&field.id) || !seen.insert(field.id.as_str()) {
                return Err(FormError::DuplicateField(field.id.clone()));
            }
            check_option_ids(field)?;
        }

        let field_ids = section.fields.iter().map(|field| field.id.clone()).collect();
        for field in section.fields {
            self.fields.insert(
                field.id.clone(),
                FieldNode {
                    section_id: section.id.clone(),
                    field,
                },
            );
        }
        self.section_order.push(section.id.clone());
        self.sections.insert(
            section.id,
            SectionNode {
                label: section.label,
                description: section.description,
                columns: section.columns.clamp(1, MAX_SECTION_COLUMNS),
                field_ids,
            },
        );
        Ok(())
    }

    pub fn section_ids(&self) -> &[String] {
        &self.section_order
    }

    pub fn set_section_label(&mut self, section_id: &str, label: impl Into<String>) -> Result<(), FormError> {
        self.section_mut(section_id)?.label = label.into();
        Ok(())
    }

    pub fn set_section_description(
        &mut self,
        section_id: &str,
        description: Option<String>,
    ) -> Result<(), FormError> {
        self.section_mut(section_id)?.description = description.filter(|text| !text.is_empty());
        Ok(())
    }

    /// Sets the display grid arity, clamped to 1..=4.
    pub fn set_section_columns(&mut self, section_id: &str, columns: u8) -> Result<u8, FormError> {
        let clamped = columns.clamp(1, MAX_SECTION_COLUMNS);
        self.section_mut(section_id)?.columns = clamped;
        Ok(clamped)
    }

    /// Removes a section together with its fields.
    pub fn remove_section(&mut self, section_id: &str) -> Result<Vec<Field>, FormError> {
        let node = self
            .sections
            .remove(section_id)
            .ok_or_else(|| FormError::UnknownSection(section_id.to_string()))?;
        self.section_order.retain(|id| id != section_id);
        Ok(node
            .field_ids
            .iter()
            .filter_map(|field_id| self.fields.remove(field_id))
            .map(|field_node| field_node.field)
            .collect())
    }

    pub fn move_section(&mut self, from: usize, to: usize) -> Result<(), FormError> {
        move_item(&mut self.section_order, "sections", from, to)
    }

    // -- fields ----------------------------------------------------------

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.get(field_id).map(|node| &node.field)
    }

    pub fn section_of(&self, field_id: &str) -> Option<&str> {
        self.fields.get(field_id).map(|node| node.section_id.as_str())
    }

    /// Every field, in section then position order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.section_order
            .iter()
            .filter_map(|id| self.sections.get(id))
            .flat_map(|node| node.field_ids.iter())
            .filter_map(|field_id| self.field(field_id))
    }

    /// Appends `field` to a section. Its references are checked like any edit.
    pub fn add_field(&mut self, section_id: &str, field: Field) -> Result<(), FormError> {
        if !self.sections.contains_key(section_id) {
            return Err(FormError::UnknownSection(section_id.to_string()));
        }
        if self.fields.contains_key(&field.id) {
            return Err(FormError::DuplicateField(field.id));
        }
        self.check_references(&field, None)?;
        self.section_mut(section_id)?.field_ids.push(field.id.clone());
        self.fields.insert(
            field.id.clone(),
            FieldNode {
                section_id: section_id.to_string(),
                field,
            },
        );
        Ok(())
    }

    /// Creates a field of `kind` with builder defaults and returns its id.
    pub fn add_new_field(&mut self, section_id: &str, kind: FieldKind) -> Result<String, FormError> {
        let field = Field::generated(kind);
        let id = field.id.clone();
        self.add_field(section_id, field)?;
        Ok(id)
    }

    /// Edits a field in place. The edit is dropped if it changes the id,
    /// introduces a dependency cycle or sets a malformed pattern.
    pub fn update_field(
        &mut self,
        field_id: &str,
        edit: impl FnOnce(&mut Field),
    ) -> Result<(), FormError> {
        let current = self
            .field(field_id)
            .ok_or_else(|| FormError::UnknownField(field_id.to_string()))?;
        let mut updated = current.clone();
        edit(&mut updated);
        updated.id = field_id.to_string();

        if updated.pattern != current.pattern
            && let Some(pattern) = updated.pattern()
        {
            check_pattern(pattern)?;
        }
        self.check_references(&updated, Some(current))?;

        if let Some(node) = self.fields.get_mut(field_id) {
            node.field = updated;
        }
        Ok(())
    }

    /// Removes a field. Dependencies pointing at it are left to fail open.
    pub fn remove_field(&mut self, field_id: &str) -> Result<Field, FormError> {
        let node = self
            .fields
            .remove(field_id)
            .ok_or_else(|| FormError::UnknownField(field_id.to_string()))?;
        if let Some(section) = self.sections.get_mut(&node.section_id) {
            section.field_ids.retain(|id| id != field_id);
        }
        Ok(node.field)
    }

    /// Reorders a field within its section.
    pub fn move_field(&mut self, section_id: &str, from: usize, to: usize) -> Result<(), FormError> {
        let section = self.section_mut(section_id)?;
        move_item(&mut section.field_ids, section_id, from, to)
    }

    // -- dependencies ----------------------------------------------------

    /// Fields `field_id` may depend on without closing a cycle.
    pub fn dependency_candidates(&self, field_id: &str) -> Result<Vec<&Field>, FormError> {
        if !self.fields.contains_key(field_id) {
            return Err(FormError::UnknownField(field_id.to_string()));
        }
        Ok(self
            .fields()
            .filter(|candidate| candidate.id != field_id)
            .filter(|candidate| !self.depends_on(&candidate.id, field_id))
            .collect())
    }

    pub fn set_dependency(
        &mut self,
        field_id: &str,
        dependency: Option<Dependency>,
    ) -> Result<(), FormError> {
        self.update_field(field_id, |field| field.dependency = dependency)
    }

    /// Values offered when `target_id` is picked as a dependency target.
    /// Empty means the value is typed freely.
    pub fn dependency_value_choices(&self, target_id: &str) -> Vec<FieldOption> {
        let Some(target) = self.field(target_id) else {
            return Vec::new();
        };
        match target.kind {
            FieldKind::Radio | FieldKind::Dropdown if target.api_config.is_none() => {
                target.options.clone()
            }
            FieldKind::Radio
            | FieldKind::Dropdown
            | FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Checkbox
            | FieldKind::Switch
            | FieldKind::Table => Vec::new(),
        }
    }

    /// True when `candidate_id` reaches `current_id` through dependency or
    /// `dependsOn` edges.
    fn depends_on(&self, candidate_id: &str, current_id: &str) -> bool {
        let mut visited = HashSet::new();
        self.reaches(candidate_id, current_id, &mut visited)
    }

    fn reaches<'a>(&'a self, from: &'a str, target: &str, visited: &mut HashSet<&'a str>) -> bool {
        if from == target {
            return true;
        }
        if !visited.insert(from) {
            return false;
        }
        let Some(field) = self.field(from) else {
            return false;
        };
        field
            .referenced_fields()
            .any(|next| self.reaches(next, target, visited))
    }

    fn check_references(&self, field: &Field, previous: Option<&Field>) -> Result<(), FormError> {
        check_option_ids(field)?;
        if let Some(dependency) = &field.dependency
            && previous.and_then(|prev| prev.dependency.as_ref()) != Some(dependency)
            && !self.fields.contains_key(&dependency.field_id)
        {
            return Err(FormError::UnknownField(dependency.field_id.clone()));
        }
        for target in field.referenced_fields() {
            if target == field.id {
                return Err(FormError::SelfDependency(field.id.clone()));
            }
            if self.depends_on(target, &field.id) {
                return Err(FormError::DependencyCycle {
                    field: field.id.clone(),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }

    // -- option sources --------------------------------------------------

    /// Switches a field to its static option list, dropping any api config.
    pub fn use_static_options(&mut self, field_id: &str) -> Result<(), FormError> {
        self.update_field(field_id, |field| field.api_config = None)
    }

    /// Installs a remote source and clears the static options.
    pub fn use_remote_options(&mut self, field_id: &str, config: ApiConfig) -> Result<(), FormError> {
        self.update_field(field_id, |field| {
            field.api_config = Some(config);
            field.options.clear();
        })
    }

    /// Replaces the api params from editor text. Invalid text keeps the
    /// previous params.
    pub fn set_params_json(&mut self, field_id: &str, text: &str) -> Result<(), FormError> {
        let params = ApiConfig::parse_params(text)?;
        self.update_field(field_id, |field| {
            field.api_config.get_or_insert_with(ApiConfig::default).params = params;
        })
    }

    pub fn set_pattern(&mut self, field_id: &str, pattern: Option<String>) -> Result<(), FormError> {
        self.update_field(field_id, |field| {
            field.pattern = pattern.filter(|text| !text.is_empty());
        })
    }

    /// Adds a static option; blank labels are ignored.
    pub fn add_option(&mut self, field_id: &str, label: &str) -> Result<Option<String>, FormError> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(None);
        }
        let option = FieldOption::labelled(label);
        let id = option.id.clone();
        self.update_field(field_id, |field| field.options.push(option))?;
        Ok(Some(id))
    }

    pub fn rename_option(&mut self, field_id: &str, index: usize, label: &str) -> Result<(), FormError> {
        self.option_index_check(field_id, index)?;
        self.update_field(field_id, |field| field.options[index].label = label.to_string())
    }

    pub fn remove_option(&mut self, field_id: &str, index: usize) -> Result<FieldOption, FormError> {
        self.option_index_check(field_id, index)?;
        let removed = self
            .field(field_id)
            .map(|field| field.options[index].clone())
            .ok_or_else(|| FormError::UnknownField(field_id.to_string()))?;
        self.update_field(field_id, |field| {
            field.options.remove(index);
        })?;
        Ok(removed)
    }

    fn option_index_check(&self, field_id: &str, index: usize) -> Result<(), FormError> {
        let field = self
            .field(field_id)
            .ok_or_else(|| FormError::UnknownField(field_id.to_string()))?;
        if index >= field.options.len() {
            return Err(FormError::OutOfRange {
                container: field_id.to_string(),
                index,
                len: field.options.len(),
            });
        }
        Ok(())
    }

    fn section_mut(&mut self, section_id: &str) -> Result<&mut SectionNode, FormError> {
        self.sections
            .get_mut(section_id)
            .ok_or_else(|| FormError::UnknownSection(section_id.to_string()))
    }
}

fn check_pattern(pattern: &str) -> Result<(), FormError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|err| FormError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })
}

/// Option ids must be unique within a field and within each column.
fn check_option_ids(field: &Field) -> Result<(), FormError> {
    let lists = std::iter::once(&field.options).chain(field.columns.iter().map(|column| &column.options));
    for options in lists {
        let mut seen = HashSet::new();
        if let Some(option) = options.iter().find(|option| !seen.insert(option.id.as_str())) {
            return Err(FormError::DuplicateOption {
                field: field.id.clone(),
                option: option.id.clone(),
            });
        }
    }
    Ok(())
}

fn move_item(items: &mut Vec<String>, container: &str, from: usize, to: usize) -> Result<(), FormError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(FormError::OutOfRange {
                container: container.to_string(),
                index,
                len,
            });
        }
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}
