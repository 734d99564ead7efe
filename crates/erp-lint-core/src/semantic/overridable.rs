//! Override resolution across declaration layers.
//!
//! Same-named declarations found in successive layers are chained oldest
//! first. Every chain is shared between all items of that name, so asking an
//! older item for its overrides is an index into the same list.

use crate::cancel::Cancelled;
use crate::context::AnalysisContext;
use crate::semantic::hierarchy::TypeLayer;
use std::collections::HashMap;
use std::sync::Arc;

/// One textual declaration in an override chain.
#[derive(Debug, Clone)]
pub struct Declaration<T> {
    /// Classified payload.
    pub item: T,
    /// Index of the declaring layer.
    pub layer: usize,
    /// Global declaration counter across the whole build.
    pub declaration_order: usize,
}

/// A named declaration together with its override chain.
#[derive(Debug)]
pub struct OverridableItem<T> {
    name: Arc<str>,
    chain: Arc<[Declaration<T>]>,
    position: usize,
}

impl<T> Clone for OverridableItem<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            chain: Arc::clone(&self.chain),
            position: self.position,
        }
    }
}

impl<T> OverridableItem<T> {
    /// Logical member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This declaration's payload.
    #[must_use]
    pub fn item(&self) -> &T {
        &self.chain[self.position].item
    }

    /// Layer that introduced this declaration.
    #[must_use]
    pub fn declaring_layer(&self) -> usize {
        self.chain[self.position].layer
    }

    /// Declaration counter of this declaration.
    #[must_use]
    pub fn declaration_order(&self) -> usize {
        self.chain[self.position].declaration_order
    }

    /// The whole chain, oldest first.
    #[must_use]
    pub fn chain(&self) -> &[Declaration<T>] {
        &self.chain
    }

    /// The most-derived declaration of this name.
    #[must_use]
    pub fn nearest_declaration(&self) -> &Declaration<T> {
        &self.chain[self.chain.len() - 1]
    }

    /// This declaration followed by everything it overrides.
    ///
    /// Walks nearest to oldest; call `.rev()` for oldest to nearest.
    pub fn this_and_overridden_items(
        &self,
    ) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.chain[..=self.position].iter().rev().map(|d| &d.item)
    }

    /// Everything this declaration overrides, strictly older than it.
    ///
    /// Walks nearest to oldest so a search for the closest ancestor with some
    /// property stops at the first hit. Call `.rev()`, or use
    /// [`overridden_declarations`](Self::overridden_declarations), for oldest
    /// to nearest.
    pub fn just_overridden_items(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.chain[..self.position].iter().rev().map(|d| &d.item)
    }

    /// Declarations this one overrides, oldest first.
    #[must_use]
    pub fn overridden_declarations(&self) -> &[Declaration<T>] {
        &self.chain[..self.position]
    }

    /// The declaration directly overridden by this one.
    #[must_use]
    pub fn overridden(&self) -> Option<Self> {
        self.position.checked_sub(1).map(|position| Self {
            name: Arc::clone(&self.name),
            chain: Arc::clone(&self.chain),
            position,
        })
    }

    /// Returns `true` if this declaration overrides an older one.
    #[must_use]
    pub fn is_override(&self) -> bool {
        self.position > 0
    }
}

/// Incremental builder folding declarations oldest layer first.
#[derive(Debug)]
pub struct CollectionBuilder<T> {
    chains: Vec<(Arc<str>, Vec<Declaration<T>>)>,
    index: HashMap<Arc<str>, usize>,
    next_order: usize,
}

impl<T> Default for CollectionBuilder<T> {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            index: HashMap::new(),
            next_order: 0,
        }
    }
}

impl<T> CollectionBuilder<T> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration found in `layer`.
    ///
    /// Layers must be fed in ascending order. A name repeated within the same
    /// layer replaces that layer's earlier declaration, keeping chains strictly
    /// monotonic by layer.
    pub fn add(&mut self, name: &str, layer: usize, item: T) {
        let declaration = Declaration {
            item,
            layer,
            declaration_order: self.next_order,
        };
        self.next_order += 1;

        if let Some(&slot) = self.index.get(name) {
            let chain = &mut self.chains[slot].1;
            if chain.last().is_some_and(|tail| tail.layer >= layer) {
                chain.pop();
            }
            chain.push(declaration);
            return;
        }

        let name: Arc<str> = Arc::from(name);
        self.index.insert(Arc::clone(&name), self.chains.len());
        self.chains.push((name, vec![declaration]));
    }

    /// Freezes the collected chains.
    #[must_use]
    pub fn finish(self) -> OverridableItemsCollection<T> {
        let items = self
            .chains
            .into_iter()
            .map(|(name, chain)| {
                let position = chain.len() - 1;
                OverridableItem {
                    name,
                    chain: Arc::from(chain),
                    position,
                }
            })
            .collect();

        OverridableItemsCollection {
            items,
            index: self.index,
        }
    }
}

/// Member name to override chain, in first-declaration order.
#[derive(Debug)]
pub struct OverridableItemsCollection<T> {
    items: Vec<OverridableItem<T>>,
    index: HashMap<Arc<str>, usize>,
}

impl<T> Default for OverridableItemsCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Clone for OverridableItemsCollection<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            index: self.index.clone(),
        }
    }
}

impl<T> OverridableItemsCollection<T> {
    /// Folds `layers` oldest to newest, collecting what `selector` yields
    /// for each layer as `(name, item)` pairs in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation is observed between layers or
    /// declarations.
    pub fn build<F, I>(
        ctx: &AnalysisContext<'_>,
        layers: &[TypeLayer],
        mut selector: F,
    ) -> Result<Self, Cancelled>
    where
        F: FnMut(&TypeLayer) -> I,
        I: IntoIterator<Item = (String, T)>,
    {
        let mut builder = CollectionBuilder::new();
        for layer in layers {
            ctx.check_cancelled()?;
            for (name, item) in selector(layer) {
                ctx.check_cancelled()?;
                builder.add(&name, layer.index(), item);
            }
        }
        Ok(builder.finish())
    }

    /// Looks up the nearest declaration of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OverridableItem<T>> {
        self.index.get(name).map(|&i| &self.items[i])
    }

    /// Returns `true` if `name` is declared in any layer.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Nearest declarations, in first-declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, OverridableItem<T>> {
        self.items.iter()
    }

    /// Collected names, in first-declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(OverridableItem::name)
    }

    /// Nearest declarations sorted by their declaration counter.
    #[must_use]
    pub fn sorted_by_declaration_order(&self) -> Vec<&OverridableItem<T>> {
        let mut items: Vec<_> = self.items.iter().collect();
        items.sort_by_key(|item| item.declaration_order());
        items
    }
}

impl<'a, T> IntoIterator for &'a OverridableItemsCollection<T> {
    type Item = &'a OverridableItem<T>;
    type IntoIter = std::slice::Iter<'a, OverridableItem<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
