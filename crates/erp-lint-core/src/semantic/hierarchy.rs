//! Hierarchy linearization.
//!
//! Turns a type into the ordered list of declaration layers whose members
//! make up its effective declaration set, most-base layer first.

use crate::cancel::Cancelled;
use crate::context::AnalysisContext;
use crate::symbols::{TypeRef, TypeSymbol};
use std::collections::HashSet;
use std::sync::Arc;

/// Role a type plays with respect to a framework entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeKind {
    /// The entity itself (a graph, a DAC).
    Primary,
    /// An extension layered onto an entity.
    Extension,
    /// No recognized relationship to the family.
    #[default]
    None,
}

/// Framework entity family being linearized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Graphs and graph extensions.
    Graph,
    /// DACs and DAC extensions.
    Dac,
}

/// One participating type in a linearized hierarchy.
#[derive(Debug, Clone)]
pub struct TypeLayer {
    symbol: Arc<TypeSymbol>,
    index: usize,
}

impl TypeLayer {
    /// The type declaring this layer's members.
    #[must_use]
    pub fn symbol(&self) -> &Arc<TypeSymbol> {
        &self.symbol
    }

    /// Position in the chain, `0` being the most-base layer.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Result of linearizing one type.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// Detected role.
    pub kind: TypeKind,
    /// Layers ordered from most-base to most-derived.
    pub layers: Vec<TypeLayer>,
    /// The entity the type is or extends, when it is part of the graph.
    pub target: Option<Arc<TypeSymbol>>,
    /// The framework root reference that terminated the base chain.
    pub root: Option<TypeRef>,
}

impl Hierarchy {
    /// Names of the layers in order.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.symbol.name.as_str())
    }
}

/// Base chain of a type: the type followed by its bases that are part of
/// the graph, plus the first base reference that left the graph.
struct BaseChain {
    types: Vec<Arc<TypeSymbol>>,
    exit: Option<TypeRef>,
}

fn base_chain(
    ctx: &AnalysisContext<'_>,
    symbol: &Arc<TypeSymbol>,
    roots: &[&str],
) -> Result<BaseChain, Cancelled> {
    let mut types = vec![Arc::clone(symbol)];
    let mut visited: HashSet<String> = HashSet::from([symbol.name.clone()]);
    let mut current = Arc::clone(symbol);

    loop {
        ctx.check_cancelled()?;
        let Some(base) = current.base.clone() else {
            return Ok(BaseChain { types, exit: None });
        };
        if roots.contains(&base.name.as_str()) {
            return Ok(BaseChain {
                types,
                exit: Some(base),
            });
        }
        match ctx.graph.type_symbol(&base.name) {
            Some(next) if visited.insert(next.name.clone()) => {
                types.push(Arc::clone(&next));
                current = next;
            }
            Some(_) => return Ok(BaseChain { types, exit: None }),
            None => {
                return Ok(BaseChain {
                    types,
                    exit: Some(base),
                })
            }
        }
    }
}

/// Appends `chain` reversed, skipping types already layered.
fn push_reversed(
    layers: &mut Vec<TypeLayer>,
    seen: &mut HashSet<String>,
    chain: Vec<Arc<TypeSymbol>>,
) {
    for symbol in chain.into_iter().rev() {
        if seen.insert(symbol.name.clone()) {
            layers.push(TypeLayer {
                index: layers.len(),
                symbol,
            });
        }
    }
}

/// Linearizes `symbol` for the given family.
///
/// Types with no recognized relationship to the family yield
/// [`TypeKind::None`] and no layers.
///
/// # Errors
///
/// Returns [`Cancelled`] if cancellation is observed while walking.
pub fn linearize(
    ctx: &AnalysisContext<'_>,
    symbol: &Arc<TypeSymbol>,
    family: Family,
) -> Result<Hierarchy, Cancelled> {
    let framework = ctx.framework;
    let (primary_root, extension_roots): (Option<&str>, Vec<&str>) = match family {
        Family::Graph => (
            Some(framework.graph.as_str()),
            vec![framework.graph_extension.as_str()],
        ),
        Family::Dac => (
            None,
            vec![
                framework.dac_extension.as_str(),
                framework.mapped_dac_extension.as_str(),
            ],
        ),
    };

    let mut roots = extension_roots.clone();
    roots.extend(primary_root);
    let chain = base_chain(ctx, symbol, &roots)?;

    let is_extension = chain
        .exit
        .as_ref()
        .is_some_and(|exit| extension_roots.contains(&exit.name.as_str()));

    if is_extension {
        return linearize_extension(ctx, chain, &roots);
    }

    let is_primary = match family {
        Family::Graph => chain
            .exit
            .as_ref()
            .is_some_and(|exit| Some(exit.name.as_str()) == primary_root),
        Family::Dac => ctx
            .graph
            .implements(&symbol.name, &framework.dac, ctx.cancellation)?,
    };

    if !is_primary {
        return Ok(Hierarchy::default());
    }

    let mut layers = Vec::with_capacity(chain.types.len());
    let mut seen = HashSet::new();
    push_reversed(&mut layers, &mut seen, chain.types);

    Ok(Hierarchy {
        kind: TypeKind::Primary,
        layers,
        target: Some(Arc::clone(symbol)),
        root: chain.exit,
    })
}

/// Extension layering: target entity chain first, then the lower extensions
/// named by the root's type arguments in ascending order, then the extension
/// itself.
///
/// The root's last type argument is the target entity; the preceding
/// arguments are the lower extensions, highest level first.
fn linearize_extension(
    ctx: &AnalysisContext<'_>,
    chain: BaseChain,
    roots: &[&str],
) -> Result<Hierarchy, Cancelled> {
    let root = chain.exit.clone();
    let args: &[TypeRef] = root.as_ref().map_or(&[], |r| r.args.as_slice());

    let mut layers = Vec::new();
    let mut seen = HashSet::new();

    let target = args.last().and_then(|t| ctx.graph.type_symbol(&t.name));
    if let Some(target) = &target {
        let target_chain = base_chain(ctx, target, roots)?;
        push_reversed(&mut layers, &mut seen, target_chain.types);
    }

    let lower = args.len().saturating_sub(1);
    for arg in args[..lower].iter().rev() {
        ctx.check_cancelled()?;
        if let Some(extension) = ctx.graph.type_symbol(&arg.name) {
            let extension_chain = base_chain(ctx, &extension, roots)?;
            push_reversed(&mut layers, &mut seen, extension_chain.types);
        }
    }

    push_reversed(&mut layers, &mut seen, chain.types);

    Ok(Hierarchy {
        kind: TypeKind::Extension,
        layers,
        target,
        root,
    })
}
