//! # Filter — Boolean Predicates Over Component Types
//!
//! A filter decides whether an entity belongs to a system. It only ever looks
//! at *which* component types are present, never at their values:
//!
//! ```text
//! and_filter([component::<Position>(), or_filter([component::<Sprite>(),
//!                                                 component::<Mesh>()]).into()])
//!
//!        AND
//!       /   \
//!  Position  OR
//!           /  \
//!       Sprite  Mesh
//! ```
//!
//! Evaluation is a linear walk of the tree. `AND` holds when every child holds
//! (an empty `AND` always holds); `OR` holds when any child holds (an empty
//! `OR` never does).
//!
//! ## Hypothetical State
//!
//! During a flush the world asks "would this entity still match once its
//! removals are applied?" before deleting anything. It answers that by
//! evaluating the filter against a plain [`TypeSet`] built from the future
//! state. Entity evaluation goes through the very same routine, so the two can
//! never disagree.

use std::any::TypeId;
use std::fmt;

use super::component::{Component, ComponentType, TypeSet};
use super::entity::Entity;
use super::world::World;
use crate::error::Result;

/// How a filter node combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    And,
    Or,
}

/// A child of a filter node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterItem {
    Component(ComponentType),
    Nested(Filter),
}

impl FilterItem {
    fn eval(&self, has: &impl Fn(TypeId) -> bool) -> bool {
        match self {
            FilterItem::Component(ty) => has(ty.id()),
            FilterItem::Nested(filter) => filter.eval(has),
        }
    }
}

impl From<ComponentType> for FilterItem {
    fn from(ty: ComponentType) -> Self {
        FilterItem::Component(ty)
    }
}

impl From<Filter> for FilterItem {
    fn from(filter: Filter) -> Self {
        FilterItem::Nested(filter)
    }
}

/// An immutable AND/OR tree over component types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    op: FilterOp,
    items: Vec<FilterItem>,
}

impl Filter {
    /// An empty `AND` node. Add children with [`with`](Self::with) and
    /// [`nest`](Self::nest).
    pub fn and() -> Self {
        Self {
            op: FilterOp::And,
            items: Vec::new(),
        }
    }

    /// An empty `OR` node.
    pub fn or() -> Self {
        Self {
            op: FilterOp::Or,
            items: Vec::new(),
        }
    }

    /// The single-type filter: matches entities that have a `T`.
    pub fn of<T: Component>() -> Self {
        ComponentType::of::<T>().into()
    }

    pub fn with<T: Component>(mut self) -> Self {
        self.items.push(component::<T>());
        self
    }

    pub fn nest(mut self, filter: Filter) -> Self {
        self.items.push(FilterItem::Nested(filter));
        self
    }

    pub fn op(&self) -> FilterOp {
        self.op
    }

    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    /// Evaluate against a set of component types.
    pub fn matches(&self, types: &TypeSet) -> bool {
        self.eval(&|ty| types.contains(&ty))
    }

    /// Evaluate against an entity's committed components.
    pub fn matches_entity(&self, world: &World, entity: Entity) -> Result<bool> {
        world.matches(self, entity)
    }

    /// Every component type mentioned anywhere in the tree, first occurrence
    /// first.
    pub fn component_types(&self) -> Vec<ComponentType> {
        let mut out = Vec::new();
        self.collect_types(&mut out);
        out
    }

    fn collect_types(&self, out: &mut Vec<ComponentType>) {
        for item in &self.items {
            match item {
                FilterItem::Component(ty) => {
                    if !out.contains(ty) {
                        out.push(*ty);
                    }
                }
                FilterItem::Nested(filter) => filter.collect_types(out),
            }
        }
    }

    fn eval(&self, has: &impl Fn(TypeId) -> bool) -> bool {
        match self.op {
            FilterOp::And => self.items.iter().all(|item| item.eval(has)),
            FilterOp::Or => self.items.iter().any(|item| item.eval(has)),
        }
    }
}

impl From<ComponentType> for Filter {
    fn from(ty: ComponentType) -> Self {
        Self {
            op: FilterOp::And,
            items: vec![FilterItem::Component(ty)],
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = match self.op {
            FilterOp::And => " & ",
            FilterOp::Or => " | ",
        };
        f.write_str("(")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            match item {
                FilterItem::Component(ty) => write!(f, "{ty}")?,
                FilterItem::Nested(filter) => write!(f, "{filter}")?,
            }
        }
        f.write_str(")")
    }
}

/// A leaf naming component type `T`.
pub fn component<T: Component>() -> FilterItem {
    FilterItem::Component(ComponentType::of::<T>())
}

/// An `AND` node over `items`.
pub fn and_filter<I>(items: I) -> Filter
where
    I: IntoIterator,
    I::Item: Into<FilterItem>,
{
    Filter {
        op: FilterOp::And,
        items: items.into_iter().map(Into::into).collect(),
    }
}

/// An `OR` node over `items`.
pub fn or_filter<I>(items: I) -> Filter
where
    I: IntoIterator,
    I::Item: Into<FilterItem>,
{
    Filter {
        op: FilterOp::Or,
        items: items.into_iter().map(Into::into).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    struct Sprite;
    struct Mesh;
    struct Hidden;

    fn types(list: &[TypeId]) -> TypeSet {
        list.iter().copied().collect()
    }

    fn renderable() -> Filter {
        and_filter([
            component::<Position>(),
            or_filter([component::<Sprite>(), component::<Mesh>()]).into(),
        ])
    }

    #[test]
    fn and_requires_every_child() {
        let filter = and_filter([component::<Position>(), component::<Sprite>()]);
        assert!(filter.matches(&types(&[TypeId::of::<Position>(), TypeId::of::<Sprite>()])));
        assert!(!filter.matches(&types(&[TypeId::of::<Position>()])));
        assert!(!filter.matches(&TypeSet::new()));
    }

    #[test]
    fn or_requires_any_child() {
        let filter = or_filter([component::<Sprite>(), component::<Mesh>()]);
        assert!(filter.matches(&types(&[TypeId::of::<Mesh>()])));
        assert!(!filter.matches(&types(&[TypeId::of::<Position>()])));
    }

    #[test]
    fn nested_filters() {
        let filter = renderable();
        assert!(filter.matches(&types(&[TypeId::of::<Position>(), TypeId::of::<Mesh>()])));
        assert!(filter.matches(&types(&[
            TypeId::of::<Position>(),
            TypeId::of::<Sprite>(),
            TypeId::of::<Hidden>()
        ])));
        assert!(!filter.matches(&types(&[TypeId::of::<Sprite>(), TypeId::of::<Mesh>()])));
    }

    #[test]
    fn empty_nodes() {
        assert!(Filter::and().matches(&TypeSet::new()));
        assert!(!Filter::or().matches(&types(&[TypeId::of::<Position>()])));
    }

    #[test]
    fn bare_type_is_single_and() {
        let filter = Filter::of::<Position>();
        assert_eq!(filter.op(), FilterOp::And);
        assert_eq!(filter, and_filter([component::<Position>()]));
        assert_eq!(Filter::from(ComponentType::of::<Position>()), filter);
    }

    #[test]
    fn builder_matches_functions() {
        let built = Filter::and()
            .with::<Position>()
            .nest(Filter::or().with::<Sprite>().with::<Mesh>());
        assert_eq!(built, renderable());
    }

    #[test]
    fn lists_component_types_once() {
        let filter = and_filter([
            component::<Position>(),
            or_filter([component::<Position>(), component::<Mesh>()]).into(),
        ]);
        assert_eq!(
            filter.component_types(),
            vec![ComponentType::of::<Position>(), ComponentType::of::<Mesh>()]
        );
    }

    #[test]
    fn display() {
        assert_eq!(renderable().to_string(), "(Position & (Sprite | Mesh))");
        assert_eq!(Filter::or().to_string(), "()");
    }
}
