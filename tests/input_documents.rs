// Integration tests building geometries from JSON documents and exporting
// their flat source regions as CSG zones

use approx::assert_relative_eq;
use yamoc::csg::{CsgExport, CsgOperator};
use yamoc::error::GeometryError;
use yamoc::input::GeometryInput;
use yamoc::point::Point;
use yamoc::surface::BoundaryType;
use yamoc::track::Track;

const PIN_ROW: &str = r#"{
    "settings": {"tiny_move": 1e-9},
    "materials": [
        {"material_id": 1, "name": "uo2", "sigma_t": [0.45, 1.2], "sigma_a": [0.01, 0.1],
         "sigma_s": [[0.42, 0.02], [0.0, 1.1]],
         "sigma_f": [0.005, 0.08], "nu_sigma_f": [0.0125, 0.2], "chi": [1.0, 0.0]},
        {"material_id": 2, "name": "water", "sigma_t": [0.6, 2.0], "sigma_a": [0.0005, 0.02],
         "sigma_s": [[0.55, 0.0495], [0.0, 1.98]]}
    ],
    "surfaces": [
        {"surface_id": 1, "kind": {"type": "xplane", "x0": -1.26}, "boundary_type": "reflective"},
        {"surface_id": 2, "kind": {"type": "xplane", "x0": 1.26}, "boundary_type": "reflective"},
        {"surface_id": 3, "kind": {"type": "yplane", "y0": -0.63}, "boundary_type": "reflective"},
        {"surface_id": 4, "kind": {"type": "yplane", "y0": 0.63}, "boundary_type": "reflective"},
        {"surface_id": 5, "kind": {"type": "circle", "x0": 0.0, "y0": 0.0, "radius": 0.4}}
    ],
    "cells": [
        {"cell_id": 1, "universe_id": 0, "kind": {"type": "fill", "universe_fill": 20}, "surfaces": [1, -2, 3, -4]},
        {"cell_id": 10, "universe_id": 10, "kind": {"type": "material", "material_id": 1, "num_rings": 2}, "surfaces": [-5]},
        {"cell_id": 11, "universe_id": 10, "kind": {"type": "material", "material_id": 2, "num_sectors": 4}, "surfaces": [5]}
    ],
    "lattices": [
        {"lattice_id": 20, "num_x": 2, "num_y": 1, "pitch_x": 1.26, "pitch_y": 1.26, "universes": [[10, 10]]}
    ]
}"#;

#[test]
fn test_build_pin_row() {
    let input = GeometryInput::from_json_str(PIN_ROW).unwrap();
    assert_eq!(input.settings.tiny_move, 1e-9);
    assert!(input.materials[0].is_fissile());

    let geometry = input.build().unwrap();
    // Per pin: two fuel rings and four moderator sectors
    assert_eq!(geometry.num_fsrs(), 12);
    assert_eq!(geometry.num_lattices(), 1);
    assert_relative_eq!(geometry.width(), 2.52);
    assert_relative_eq!(geometry.height(), 1.26);
    assert_eq!(geometry.boundary_surfaces().len(), 4);

    // Left pin, across both rings and out through the moderator
    let mut track = Track::new(Point::new(-1.26, 0.1), 0.0);
    geometry.segmentize(&mut track).unwrap();
    assert_relative_eq!(track.length(), 2.52, epsilon = 1e-6);
    assert_eq!(track.boundary_out, BoundaryType::Reflective);
    let water = geometry.material(2).unwrap().uid;
    assert_eq!(track.segments.first().map(|s| s.material), Some(water));
    assert_eq!(track.segments.last().map(|s| s.material), Some(water));
}

#[test]
fn test_json_file_round_trip() {
    let input = GeometryInput::from_json_str(PIN_ROW).unwrap();
    let path = std::env::temp_dir().join("yamoc_pin_row.json");
    std::fs::write(&path, serde_json::to_string_pretty(&input).unwrap()).unwrap();
    let reread = GeometryInput::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(reread.cells, input.cells);
    assert_eq!(reread.lattices, input.lattices);
    assert_eq!(reread.build().unwrap().num_fsrs(), 12);
}

#[test]
fn test_missing_fill_universe() {
    let document = PIN_ROW.replace(r#""universe_fill": 20"#, r#""universe_fill": 21"#);
    let input = GeometryInput::from_json_str(&document).unwrap();
    assert!(matches!(
        input.build(),
        Err(GeometryError::UnknownReference { id: 21, .. })
    ));
}

#[test]
fn test_csg_zones_match_located_regions() {
    let geometry = GeometryInput::from_json_str(PIN_ROW).unwrap().build().unwrap();
    let export = CsgExport::from_geometry(&geometry).unwrap();
    assert_eq!(export.zones.len(), geometry.num_fsrs());
    assert_eq!(export.surf_coeffs.len(), 3 * export.num_surfaces());
    assert_eq!(export.left_ids.len(), export.num_nodes());
    assert_eq!(export.right_ids.len(), export.num_nodes());
    let domain = export.domain.unwrap();
    assert_eq!(export.oper_flags[domain], CsgOperator::Union);

    let points = [
        Point::new(-0.53, 0.05),
        Point::new(-0.33, 0.1),
        Point::new(1.13, 0.3),
        Point::new(0.5, -0.5),
        Point::new(-1.1, 0.2),
    ];
    for point in points {
        let (coords, _) = geometry.locate(point).unwrap();
        let fsr = geometry.find_fsr_id(&coords);
        let containing: Vec<usize> = (0..export.zones.len())
            .filter(|&zone| export.node_contains(export.zones[zone], &point))
            .collect();
        assert_eq!(containing, vec![fsr]);
        assert!(export.node_contains(domain, &point));
    }
    assert!(!export.node_contains(domain, &Point::new(0.0, 1.0)));
}
