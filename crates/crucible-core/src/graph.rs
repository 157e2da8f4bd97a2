//! Graph Store: element arena plus the ingredient -> target prerequisite graph

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use tracing::{debug, info, warn};

use crate::error::GraphError;
use crate::loader::RawElement;
use crate::model::*;

/// Immutable element/recipe graph, built once and shared read-only.
///
/// Nodes are elements; an edge `a -> t` exists for every recipe that uses `a`
/// to make a non-primitive `t`. Diamond-shaped sharing is normal, cycles are
/// rejected at build time.
pub struct GraphStore {
    inner: StableDiGraph<Element, RecipeId>,
    by_name: HashMap<String, ElementId>,
    recipes: Vec<Recipe>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("element_count", &self.inner.node_count())
            .field("recipe_count", &self.recipes.len())
            .finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Grey,
    Black,
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    next: usize,
}

impl GraphStore {
    /// Build the store from raw element records.
    ///
    /// Fails on duplicate names, dangling ingredient references and recipe
    /// cycles. Swapped-ingredient duplicates are collapsed to the first one seen.
    pub fn from_elements(raw: Vec<RawElement>) -> Result<Self, GraphError> {
        let mut store = GraphStore {
            inner: StableDiGraph::with_capacity(raw.len(), raw.len() * 2),
            by_name: HashMap::with_capacity(raw.len()),
            recipes: Vec::new(),
        };

        for el in &raw {
            if store.by_name.contains_key(&el.name) {
                return Err(GraphError::DuplicateElement(el.name.clone()));
            }
            let idx = store.inner.add_node(Element {
                id: ElementId::default(),
                name: el.name.clone(),
                image_path: el.image_path.clone(),
                tier: 0,
                recipes_producing: Vec::new(),
                recipes_consuming: Vec::new(),
            });
            let id = ElementId(idx.index() as u32);
            store.inner[idx].id = id;
            store.by_name.insert(el.name.clone(), id);
        }

        let mut seen: HashSet<Recipe> = HashSet::new();
        for el in raw {
            for ingredients in el.recipes {
                let [one, two] = match <[String; 2]>::try_from(ingredients) {
                    Ok(pair) => pair,
                    Err(other) => {
                        warn!(
                            "Skipping recipe for {} with {} ingredients",
                            el.name,
                            other.len()
                        );
                        continue;
                    }
                };
                let recipe = Recipe::new(one, two, el.name.clone());
                if seen.contains(&recipe) {
                    debug!(
                        "Dropping duplicate recipe {} + {} -> {}",
                        recipe.element_one, recipe.element_two, recipe.target_element_name
                    );
                    continue;
                }
                store.add_recipe(recipe.clone())?;
                seen.insert(recipe);
            }
        }

        if let Some(path) = store.find_cycle() {
            return Err(GraphError::Cycle { path });
        }
        store.assign_tiers()?;

        info!(
            "Graph store ready: {} elements, {} recipes",
            store.element_count(),
            store.recipe_count()
        );
        Ok(store)
    }

    fn add_recipe(&mut self, recipe: Recipe) -> Result<(), GraphError> {
        let resolve = |name: &str| {
            self.by_name
                .get(name)
                .copied()
                .ok_or_else(|| GraphError::DanglingReference {
                    target: recipe.target_element_name.clone(),
                    missing: name.to_string(),
                })
        };
        let target = resolve(&recipe.target_element_name)?;
        let one = resolve(&recipe.element_one)?;
        let two = resolve(&recipe.element_two)?;

        let id = RecipeId(self.recipes.len() as u32);
        let target_is_primitive = is_primitive(&recipe.target_element_name);
        self.recipes.push(recipe);

        self.inner[node(target)].recipes_producing.push(id);
        self.inner[node(one)].recipes_consuming.push(id);
        if two != one {
            self.inner[node(two)].recipes_consuming.push(id);
        }

        if !target_is_primitive {
            self.inner.add_edge(node(one), node(target), id);
            if two != one {
                self.inner.add_edge(node(two), node(target), id);
            }
        }
        Ok(())
    }

    /// Depth-first three-colour search for a back edge. Returns the cycle as a
    /// list of element names, first name repeated at the end.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut color: HashMap<NodeIndex, Color> = HashMap::new();

        for start in self.inner.node_indices() {
            if color.contains_key(&start) {
                continue;
            }
            color.insert(start, Color::Grey);
            let mut stack = vec![Frame {
                node: start,
                successors: self.successors(start),
                next: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                let Some(&succ) = frame.successors.get(frame.next) else {
                    color.insert(frame.node, Color::Black);
                    stack.pop();
                    continue;
                };
                frame.next += 1;

                match color.get(&succ) {
                    Some(Color::Grey) => {
                        let from = stack.iter().position(|f| f.node == succ).unwrap_or(0);
                        let mut path: Vec<String> = stack[from..]
                            .iter()
                            .map(|f| self.inner[f.node].name.clone())
                            .collect();
                        path.push(self.inner[succ].name.clone());
                        return Some(path);
                    }
                    Some(Color::Black) => {}
                    None => {
                        color.insert(succ, Color::Grey);
                        stack.push(Frame {
                            node: succ,
                            successors: self.successors(succ),
                            next: 0,
                        });
                    }
                }
            }
        }
        None
    }

    fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.inner
            .neighbors_directed(idx, Direction::Outgoing)
            .collect()
    }

    /// Tier 0 for primitives and recipe-less elements, otherwise the cheapest
    /// producing recipe's `1 + max(ingredient tiers)`.
    fn assign_tiers(&mut self) -> Result<(), GraphError> {
        let order = petgraph::algo::toposort(&self.inner, None).map_err(|cycle| {
            GraphError::Cycle {
                path: vec![self.inner[cycle.node_id()].name.clone()],
            }
        })?;

        for idx in order {
            let element = &self.inner[idx];
            if is_primitive(&element.name) || element.is_recipe_less() {
                continue;
            }
            let tier = element
                .recipes_producing
                .iter()
                .map(|&rid| {
                    let recipe = &self.recipes[rid.0 as usize];
                    let t1 = self.tier_of(&recipe.element_one);
                    let t2 = self.tier_of(&recipe.element_two);
                    1 + t1.max(t2)
                })
                .min()
                .unwrap_or(0);
            self.inner[idx].tier = tier;
        }
        Ok(())
    }

    fn tier_of(&self, name: &str) -> u32 {
        self.get(name).map_or(0, |e| e.tier)
    }

    /// Case-sensitive exact lookup.
    pub fn lookup(&self, name: &str) -> Result<&Element, GraphError> {
        self.get(name)
            .ok_or_else(|| GraphError::ElementNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.by_name.get(name).and_then(|&id| self.element(id))
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.inner.node_weight(node(id))
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(id.0 as usize)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterate over all elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Recipes whose target is `element`.
    pub fn producing<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Recipe> {
        element
            .recipes_producing
            .iter()
            .filter_map(move |&id| self.recipe(id))
    }

    /// Recipes that use `element` as an ingredient.
    pub fn consuming<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Recipe> {
        element
            .recipes_consuming
            .iter()
            .filter_map(move |&id| self.recipe(id))
    }

    pub fn element_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// Number of elements per tier.
    pub fn tier_histogram(&self) -> BTreeMap<u32, usize> {
        let mut histogram = BTreeMap::new();
        for element in self.elements() {
            *histogram.entry(element.tier).or_insert(0) += 1;
        }
        histogram
    }
}

fn node(id: ElementId) -> NodeIndex {
    NodeIndex::new(id.0 as usize)
}
