use crate::Project;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConstraint {
    pub category: String,
    pub context: String,
}

impl FilterConstraint {
    pub fn label(&self) -> String {
        format!("{}:{}", self.category, self.context)
    }
}

/// Ordered (category, context) constraints combined by logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    constraints: Vec<FilterConstraint>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the pair when present, appends it otherwise. Returns whether
    /// the pair is active afterwards.
    pub fn toggle(&mut self, category: &str, context: &str) -> bool {
        if let Some(position) = self
            .constraints
            .iter()
            .position(|item| item.category == category && item.context == context)
        {
            self.constraints.remove(position);
            return false;
        }

        self.constraints.push(FilterConstraint {
            category: category.to_owned(),
            context: context.to_owned(),
        });
        true
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[FilterConstraint] {
        &self.constraints
    }

    pub fn is_visible(&self, project: &Project) -> bool {
        self.constraints
            .iter()
            .all(|item| project.has_context(&item.category, &item.context))
    }

    pub fn label(&self) -> String {
        if self.constraints.is_empty() {
            return "none".to_owned();
        }
        self.constraints
            .iter()
            .map(FilterConstraint::label)
            .collect::<Vec<_>>()
            .join(" & ")
    }
}
