//! Property-based tests for surface graph construction.
//!
//! Run with: cargo test --test graph_properties

use cortigraph::prelude::*;
use nalgebra::Point3;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_position() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// A triangle with three distinct vertex indices below `n`.
fn arb_face(n: usize) -> impl Strategy<Value = [usize; 3]> {
    prop::sample::subsequence((0..n).collect::<Vec<_>>(), 3)
        .prop_shuffle()
        .prop_map(|v| [v[0], v[1], v[2]])
}

/// Vertices plus valid faces; some vertices may be left unreferenced.
fn arb_surface() -> impl Strategy<Value = (Vec<Point3<f64>>, Vec<[usize; 3]>)> {
    (3usize..40).prop_flat_map(|n| {
        (
            prop::collection::vec(arb_position(), n),
            prop::collection::vec(arb_face(n), 0..60),
        )
    })
}

/// A surface together with a permutation of its faces.
fn arb_surface_and_permutation(
) -> impl Strategy<Value = (Vec<Point3<f64>>, Vec<[usize; 3]>, Vec<[usize; 3]>)> {
    arb_surface().prop_flat_map(|(vertices, faces)| {
        let shuffled = Just(faces.clone()).prop_shuffle();
        (Just(vertices), Just(faces), shuffled)
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn nodes_are_exactly_face_vertices((vertices, faces) in arb_surface()) {
        let graph = build_unweighted_graph(&vertices, &faces).unwrap();

        prop_assert!(graph.num_nodes() <= vertices.len());
        let mut referenced: Vec<usize> = faces.iter().flatten().copied().collect();
        referenced.sort_unstable();
        referenced.dedup();
        prop_assert_eq!(graph.nodes().collect::<Vec<_>>(), referenced);
    }

    #[test]
    fn every_face_contributes_its_edges((vertices, faces) in arb_surface()) {
        let graph = build_unweighted_graph(&vertices, &faces).unwrap();

        for &[i, j, k] in &faces {
            prop_assert!(graph.contains_edge(i, j));
            prop_assert!(graph.contains_edge(i, k));
            prop_assert!(graph.contains_edge(j, k));
            prop_assert!(graph.contains_edge(k, i));
        }
        prop_assert!(graph.num_edges() <= 3 * faces.len());
        prop_assert_eq!(graph.edges().count(), graph.num_edges());
    }

    #[test]
    fn weights_are_symmetric_euclidean_lengths((vertices, faces) in arb_surface()) {
        let graph = build_weighted_graph(&vertices, &faces).unwrap();

        for (a, b, &w) in graph.edges() {
            let expected = (vertices[a] - vertices[b]).norm();
            prop_assert!((w - expected).abs() <= 1e-9 * expected.max(1.0));
            prop_assert!(w >= 0.0);
            prop_assert_eq!(graph.weight(a, b), graph.weight(b, a));
        }
    }

    #[test]
    fn construction_is_idempotent((vertices, faces) in arb_surface()) {
        prop_assert_eq!(
            build_unweighted_graph(&vertices, &faces).unwrap(),
            build_unweighted_graph(&vertices, &faces).unwrap()
        );
        prop_assert_eq!(
            build_weighted_graph(&vertices, &faces).unwrap(),
            build_weighted_graph(&vertices, &faces).unwrap()
        );
    }

    #[test]
    fn face_order_does_not_matter(
        (vertices, faces, shuffled) in arb_surface_and_permutation()
    ) {
        prop_assert_eq!(
            build_weighted_graph(&vertices, &faces).unwrap(),
            build_weighted_graph(&vertices, &shuffled).unwrap()
        );
    }

    #[test]
    fn winding_does_not_matter((vertices, faces) in arb_surface()) {
        let flipped: Vec<[usize; 3]> = faces.iter().map(|&[i, j, k]| [k, j, i]).collect();
        prop_assert_eq!(
            build_weighted_graph(&vertices, &faces).unwrap(),
            build_weighted_graph(&vertices, &flipped).unwrap()
        );
    }

    #[test]
    fn out_of_range_index_is_reported_at_its_face((vertices, mut faces) in arb_surface()) {
        let bad_face = faces.len();
        let n = vertices.len();
        faces.push([0, 1, n]);

        let err = build_weighted_graph(&vertices, &faces).unwrap_err();
        let reported = matches!(
            err,
            MeshError::InvalidVertexIndex { face, vertex } if face == bad_face && vertex == n
        );
        prop_assert!(reported);
    }

    #[test]
    fn parallel_and_sequential_agree((vertices, faces) in arb_surface()) {
        let parallel = GraphOptions::default().with_parallel_threshold(0);
        prop_assert_eq!(
            build_weighted_graph_with(&vertices, &faces, &parallel).unwrap(),
            build_weighted_graph_with(&vertices, &faces, &parallel.clone().sequential()).unwrap()
        );
    }
}
