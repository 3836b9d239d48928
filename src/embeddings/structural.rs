use std::collections::HashMap;

use super::EmbeddingModel;
use crate::core::ast::PythonSource;
use crate::errors::Result;

/// Feature-hashing embedder over syntax-tree shape.
///
/// Features are node kinds, parent>child kind pairs and keyword/operator
/// tokens. Identifier and literal text never contributes, so renaming
/// variables does not move the vector. Input that does not parse falls back
/// to hashing its lowercase word tokens.
pub struct StructuralEmbedder {
    dimensions: usize,
}

impl StructuralEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Hash a feature into a bucket index using FNV-1a.
    fn bucket(feature: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in feature.as_bytes() {
            h ^= u64::from(*b);
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % dims as u64) as usize
    }

    fn tree_features(source: &PythonSource) -> HashMap<String, f32> {
        let mut features: HashMap<String, f32> = HashMap::new();
        let mut cursor = source.root().walk();
        let mut parents: Vec<&'static str> = Vec::new();

        loop {
            let node = cursor.node();
            let kind = node.kind();
            let feature = if node.is_named() {
                format!("k:{kind}")
            } else {
                format!("t:{kind}")
            };
            *features.entry(feature).or_default() += 1.0;
            if let Some(parent) = parents.last() {
                *features.entry(format!("p:{parent}>{kind}")).or_default() += 1.0;
            }

            // String contents are opaque text; treat the literal as a leaf.
            if node.kind() != "string" && cursor.goto_first_child() {
                parents.push(kind);
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return features;
                }
                parents.pop();
            }
        }
    }

    fn token_features(text: &str) -> HashMap<String, f32> {
        let mut features: HashMap<String, f32> = HashMap::new();
        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|s| s.len() >= 2)
        {
            *features
                .entry(format!("w:{}", token.to_lowercase()))
                .or_default() += 1.0;
        }
        features
    }

    fn vectorize(&self, features: &HashMap<String, f32>) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        for (feature, count) in features {
            // Sublinear term frequency keeps a long body from drowning shape.
            vec[Self::bucket(feature, self.dimensions)] += 1.0 + count.ln();
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

impl EmbeddingModel for StructuralEmbedder {
    fn name(&self) -> &str {
        "structural-hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let features = match PythonSource::parse(text) {
            Ok(source) => Self::tree_features(&source),
            Err(_) => Self::token_features(text),
        };
        Ok(self.vectorize(&features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    fn embed(text: &str) -> Vec<f32> {
        StructuralEmbedder::new(256).embed(text).unwrap()
    }

    #[test]
    fn test_dimensions_and_norm() {
        let v = embed("def f(x):\n    return x * 2\n");
        assert_eq!(v.len(), 256);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_renamed_function_is_identical() {
        let a = embed("def add(a, b):\n    return a + b\n");
        let b = embed("def sum2(x, y):\n    return x + y\n");
        assert!(cosine_similarity(&a, &b) >= 0.999);
    }

    #[test]
    fn test_different_shapes_are_less_similar() {
        let add = embed("def add(a, b):\n    return a + b\n");
        let looped = embed(
            "def total(xs):\n    s = 0\n    for x in xs:\n        if x > 0:\n            s += x\n    return s\n",
        );
        assert!(cosine_similarity(&add, &looped) < 0.85);
    }

    #[test]
    fn test_unparsable_text_still_embeds() {
        let v = embed("def broken(:\n    pass");
        assert_eq!(v.len(), 256);
        assert!(v.iter().any(|x| *x != 0.0));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(embed("x = [i for i in range(3)]"), embed("x = [i for i in range(3)]"));
    }
}
