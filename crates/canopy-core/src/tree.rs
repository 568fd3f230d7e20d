//! Parse tree values
//!
//! A [`TreeNode`] is owned exclusively by its parent (or by the caller, for a
//! root). The forest extractor deep-clones every sub-derivation it reuses, so
//! rewriting a label or attribute in one tree is never observable from another
//! tree or from a sibling branch. Consumers rely on this when they substitute
//! words into leaves in place.
//!
//! The serialized shape `{name, children, attributes}` is what tree-rendering
//! front ends expect. A non-terminal derived as the empty string has no
//! children and additionally carries `"empty": true`; it is not a leaf, so
//! leaves always line up one-to-one with input positions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Attribute under which word substitution records a leaf's category
pub const TYPE_ATTRIBUTE: &str = "Type";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Derived from an empty right-hand side
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub empty: bool,
}

impl TreeNode {
    pub fn new(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        TreeNode {
            name: name.into(),
            children,
            attributes: BTreeMap::new(),
            empty: false,
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// A non-terminal that spans no input
    pub fn empty(name: impl Into<String>) -> Self {
        TreeNode {
            empty: true,
            ..Self::leaf(name)
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && !self.empty
    }

    /// Leaves in depth-first, left-to-right order, skipping empty nodes
    pub fn leaves(&self) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    pub fn leaves_mut(&mut self) -> Vec<&mut TreeNode> {
        let mut out = Vec::new();
        collect_leaves_mut(self, &mut out);
        out
    }

    pub fn leaf_labels(&self) -> Vec<&str> {
        self.leaves().into_iter().map(|n| n.name.as_str()).collect()
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }

    /// Replace leaf labels with `words`, in place.
    ///
    /// The Nth leaf (depth-first, left to right) receives the Nth word; its
    /// previous label is kept under the `Type` attribute.
    ///
    /// # Errors
    /// `InputError` if the number of words differs from the number of leaves.
    /// The tree is left untouched in that case.
    pub fn substitute_words<S: AsRef<str>>(&mut self, words: &[S]) -> Result<()> {
        let mut leaves = self.leaves_mut();
        if leaves.len() != words.len() {
            return Err(Error::InputError(format!(
                "tree has {} leaves but {} words were given",
                leaves.len(),
                words.len()
            )));
        }
        for (leaf, word) in leaves.iter_mut().zip(words) {
            let category = std::mem::replace(&mut leaf.name, word.as_ref().to_string());
            leaf.attributes.insert(TYPE_ATTRIBUTE.to_string(), category);
        }
        Ok(())
    }

    /// Multi-line rendering with box-drawing guides.
    ///
    /// ```text
    /// S
    /// ├── NP
    /// │   └── N
    /// └── VP
    ///     └── V
    /// ```
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.label());
        out.push('\n');
        for (i, child) in self.children.iter().enumerate() {
            child.pretty_into(&mut out, "", i + 1 == self.children.len());
        }
        out
    }

    fn pretty_into(&self, out: &mut String, prefix: &str, last: bool) {
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(&self.label());
        out.push('\n');

        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        for (i, child) in self.children.iter().enumerate() {
            child.pretty_into(out, &child_prefix, i + 1 == self.children.len());
        }
    }

    fn label(&self) -> String {
        match self.attributes.get(TYPE_ATTRIBUTE) {
            Some(category) => format!("{} [{}]", self.name, category),
            None if self.empty => format!("{} ε", self.name),
            None => self.name.clone(),
        }
    }
}

/// Bracketed form: `S(NP(N), VP(V))`
impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.children.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, ")")
    }
}

fn collect_leaves<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
    if node.is_leaf() {
        out.push(node);
    } else {
        for child in &node.children {
            collect_leaves(child, out);
        }
    }
}

fn collect_leaves_mut<'a>(node: &'a mut TreeNode, out: &mut Vec<&'a mut TreeNode>) {
    if node.is_leaf() {
        out.push(node);
    } else {
        for child in node.children.iter_mut() {
            collect_leaves_mut(child, out);
        }
    }
}
