// src/model/name_layers.rs
//! Parallel naming schemes for the signals of a group
//!
//! A signal group carries one or more name layers. Each layer is an ordered list
//! of M strings, row `i` of every layer naming the same signal. An empty string
//! means "no name on this layer". Layers keep their insertion order; the first
//! layer is the primary one used when a single display name is needed.

use crate::config::constants::names;
use crate::error::{VtoolError, VtoolResult};

/// Ordered map from layer name to the per-signal names on that layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameLayers {
    layers: Vec<(String, Vec<String>)>,
}

impl NameLayers {
    /// No layers
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Single default layer holding `names`
    pub fn single<S: AsRef<str>>(names: &[S]) -> Self {
        let mut layers = Self::new();
        layers.layers.push((
            names::DEFAULT_LAYER.to_string(),
            names.iter().map(|s| s.as_ref().to_string()).collect(),
        ));
        layers
    }

    /// Builder-style layer insertion; replaces an existing layer of the same name
    pub fn with_layer<S: AsRef<str>>(mut self, layer: &str, names: &[S]) -> Self {
        self.set_layer(layer, names.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    /// Insert or replace a layer without checking its length
    pub fn set_layer(&mut self, layer: &str, names: Vec<String>) {
        match self.layers.iter_mut().find(|(name, _)| name == layer) {
            Some((_, existing)) => *existing = names,
            None => self.layers.push((layer.to_string(), names)),
        }
    }

    /// Add a new layer, validating its name and length against the existing rows
    pub fn add_layer(&mut self, layer: &str, names: Vec<String>) -> VtoolResult<()> {
        if !is_layer_name(layer) {
            return Err(VtoolError::invalid_input(
                "layer",
                format!("layer name '{}' must end with '{}'", layer, names::LAYER_SUFFIX),
            ));
        }
        if self.contains_layer(layer) {
            return Err(VtoolError::invalid_input(
                "layer",
                format!("layer '{}' already exists", layer),
            ));
        }
        if !self.layers.is_empty() && names.len() != self.len() {
            return Err(VtoolError::invalid_input(
                "names",
                format!("layer '{}' has {} names, expected {}", layer, names.len(), self.len()),
            ));
        }
        self.layers.push((layer.to_string(), names));
        Ok(())
    }

    /// True if `layer` exists
    pub fn contains_layer(&self, layer: &str) -> bool {
        self.layers.iter().any(|(name, _)| name == layer)
    }

    /// Layer names in insertion order
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Names on `layer`
    pub fn layer(&self, layer: &str) -> Option<&[String]> {
        self.layers
            .iter()
            .find(|(name, _)| name == layer)
            .map(|(_, names)| names.as_slice())
    }

    /// Layers with their names, in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.layers.iter().map(|(name, names)| (name.as_str(), names.as_slice()))
    }

    /// Number of layers
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Number of rows (signals), taken from the first layer
    pub fn len(&self) -> usize {
        self.layers.first().map_or(0, |(_, names)| names.len())
    }

    /// True without any layer
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if every layer has exactly `m` entries
    pub fn all_have_len(&self, m: usize) -> bool {
        self.layers.iter().all(|(_, names)| names.len() == m)
    }

    /// True if both carry the same set of layer names, in any order
    pub fn same_layer_set(&self, other: &NameLayers) -> bool {
        self.layers.len() == other.layers.len()
            && self.layers.iter().all(|(name, _)| other.contains_layer(name))
    }

    /// True if both carry the same layers with identical contents, in any layer order
    pub fn same_names(&self, other: &NameLayers) -> bool {
        self.same_layer_set(other)
            && self
                .layers
                .iter()
                .all(|(name, names)| other.layer(name) == Some(names.as_slice()))
    }

    /// All row indices whose name matches `name` on at least one layer.
    ///
    /// The empty name matches only rows that are empty on every layer.
    pub fn resolve(&self, name: &str) -> Vec<usize> {
        (0..self.len())
            .filter(|&row| {
                if name.is_empty() {
                    self.layers.iter().all(|(_, names)| names.get(row).map_or(true, |s| s.is_empty()))
                } else {
                    self.layers
                        .iter()
                        .any(|(_, names)| names.get(row).map(String::as_str) == Some(name))
                }
            })
            .collect()
    }

    /// First matching row, if any
    pub fn resolve_primary(&self, name: &str) -> Option<usize> {
        self.resolve(name).into_iter().next()
    }

    /// Display name of a row: the first non-empty entry across layers
    pub fn primary_name(&self, row: usize) -> &str {
        self.layers
            .iter()
            .filter_map(|(_, names)| names.get(row))
            .find(|name| !name.is_empty())
            .map_or("", String::as_str)
    }

    /// Display names of every row
    pub fn primary_names(&self) -> Vec<String> {
        (0..self.len()).map(|row| self.primary_name(row).to_string()).collect()
    }

    /// True if `row` carries a non-empty name on at least one layer
    pub fn is_named(&self, row: usize) -> bool {
        !self.primary_name(row).is_empty()
    }

    /// Append one row; `layer` receives `name`, every other layer an empty string.
    /// A missing layer is created and back-filled with empty names.
    pub fn push_row(&mut self, layer: &str, name: &str) {
        let m = self.len();
        if !self.contains_layer(layer) {
            self.layers.push((layer.to_string(), vec![String::new(); m]));
        }
        for (layer_name, names) in &mut self.layers {
            names.push(if layer_name == layer { name.to_string() } else { String::new() });
        }
    }

    /// Append one row carrying `name` on every layer
    pub fn push_row_all(&mut self, name: &str) {
        if self.layers.is_empty() {
            self.layers.push((names::DEFAULT_LAYER.to_string(), Vec::new()));
        }
        for (_, names) in &mut self.layers {
            names.push(name.to_string());
        }
    }

    /// Append row `row` of `other`; layers absent from `other` receive an empty name
    pub fn push_row_from(&mut self, other: &NameLayers, row: usize) {
        for (layer, names) in &mut self.layers {
            let name = other
                .layer(layer)
                .and_then(|source| source.get(row))
                .cloned()
                .unwrap_or_default();
            names.push(name);
        }
    }

    /// New layers holding only `rows`, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> NameLayers {
        NameLayers {
            layers: self
                .layers
                .iter()
                .map(|(layer, names)| {
                    let picked = rows
                        .iter()
                        .map(|&row| names.get(row).cloned().unwrap_or_default())
                        .collect();
                    (layer.clone(), picked)
                })
                .collect(),
        }
    }

    /// Remove `rows` from every layer
    pub fn remove_rows(&mut self, rows: &[usize]) {
        for (_, names) in &mut self.layers {
            let mut row = 0;
            names.retain(|_| {
                let keep = !rows.contains(&row);
                row += 1;
                keep
            });
        }
    }

    /// Append the rows of `other`; layers missing on either side are padded with empty names
    pub fn extend(&mut self, other: &NameLayers) {
        let m_self = self.len();
        let m_other = other.len();
        for (layer, _) in &other.layers {
            if !self.contains_layer(layer) {
                self.layers.push((layer.clone(), vec![String::new(); m_self]));
            }
        }
        for (layer, names) in &mut self.layers {
            match other.layer(layer) {
                Some(extra) => names.extend(extra.iter().cloned()),
                None => names.extend(std::iter::repeat(String::new()).take(m_other)),
            }
        }
    }

    /// Same layer set with zero rows
    pub fn empty_like(&self) -> NameLayers {
        NameLayers {
            layers: self.layers.iter().map(|(layer, _)| (layer.clone(), Vec::new())).collect(),
        }
    }
}

/// True if `field` follows the layer naming convention
pub fn is_layer_name(field: &str) -> bool {
    field.ends_with(names::LAYER_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_layer() -> NameLayers {
        NameLayers::single(&["speed", "", "temp"]).with_layer("ShortNames", &["v", "p", ""])
    }

    #[test]
    fn test_resolve_across_layers() {
        let layers = two_layer();
        assert_eq!(layers.resolve("speed"), vec![0]);
        assert_eq!(layers.resolve("p"), vec![1]);
        assert!(layers.resolve("missing").is_empty());
    }

    #[test]
    fn test_empty_name_matches_only_fully_empty_rows() {
        let layers = two_layer();
        assert!(layers.resolve("").is_empty());

        let layers = NameLayers::single(&["a", ""]).with_layer("ShortNames", &["", ""]);
        assert_eq!(layers.resolve(""), vec![1]);
    }

    #[test]
    fn test_duplicates_resolve_in_row_order() {
        let layers = NameLayers::single(&["x", "y", "x"]);
        assert_eq!(layers.resolve("x"), vec![0, 2]);
        assert_eq!(layers.resolve_primary("x"), Some(0));
    }

    #[test]
    fn test_primary_name_falls_back_to_later_layer() {
        let layers = two_layer();
        assert_eq!(layers.primary_name(1), "p");
        assert_eq!(layers.primary_names(), vec!["speed", "p", "temp"]);
    }

    #[test]
    fn test_push_row_pads_other_layers() {
        let mut layers = two_layer();
        layers.push_row("ShortNames", "q");
        assert!(layers.all_have_len(4));
        assert_eq!(layers.layer("Names").unwrap()[3], "");
        assert_eq!(layers.layer("ShortNames").unwrap()[3], "q");

        layers.push_row("LongNames", "pressure");
        assert_eq!(layers.layer_count(), 3);
        assert!(layers.all_have_len(5));
        assert_eq!(layers.layer("LongNames").unwrap()[..4], ["", "", "", ""]);
    }

    #[test]
    fn test_remove_and_select_rows() {
        let mut layers = two_layer();
        let picked = layers.select_rows(&[2, 0]);
        assert_eq!(picked.layer("Names").unwrap(), ["temp", "speed"]);

        layers.remove_rows(&[0, 2]);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers.layer("ShortNames").unwrap(), ["p"]);
    }

    #[test]
    fn test_add_layer_validation() {
        let mut layers = two_layer();
        assert!(layers.add_layer("Aliases", vec![String::new(); 3]).is_err());
        assert!(layers.add_layer("AliasNames", vec![String::new(); 2]).is_err());
        assert!(layers.add_layer("AliasNames", vec![String::new(); 3]).is_ok());
        assert!(layers.add_layer("AliasNames", vec![String::new(); 3]).is_err());
    }

    #[test]
    fn test_layer_set_comparison() {
        let a = two_layer();
        let b = NameLayers::new()
            .with_layer("ShortNames", &["v", "p", ""])
            .with_layer("Names", &["speed", "", "temp"]);
        assert!(a.same_layer_set(&b));
        assert!(a.same_names(&b));

        let c = NameLayers::single(&["speed", "", "temp"]);
        assert!(!a.same_layer_set(&c));
    }
}
