//! End-to-end voxelization scenarios.

use glam::{Mat4, Vec3, Vec4};
use voxelizer_core::{CellPos, Mesh, Occupancy};
use voxelizer_voxel::{
    GridStore, Normalization, ProjectionMethod, VoxelizationReport, Voxelizer, VoxelizerConfig,
    VoxelizeMode,
};

fn run(mesh: &Mesh, config: VoxelizerConfig) -> (Voxelizer, VoxelizationReport) {
    let mut voxelizer = Voxelizer::new(config).unwrap();
    let report = voxelizer.voxelize(mesh);
    (voxelizer, report)
}

fn unit_cube_config(mode: VoxelizeMode) -> VoxelizerConfig {
    VoxelizerConfig::new(8)
        .with_mode(mode)
        .with_normalization(Normalization::InscribedCube)
}

fn snapshot(grid: &GridStore) -> Vec<Vec<Occupancy>> {
    (0..grid.level_count())
        .map(|i| grid.level(i).unwrap().cells().to_vec())
        .collect()
}

#[test]
fn unit_cube_solid_fills_every_cell() {
    let mesh = Mesh::cube(1.0);
    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(mesh.bounds().radius, 3.0_f32.sqrt());

    let (voxelizer, report) = run(&mesh, unit_cube_config(VoxelizeMode::Solid));
    assert_eq!(report.occupied_cells(), 512);
    assert_eq!(report.surface_cells, 296);
    assert_eq!(report.interior_cells, 216);
    assert!(!report.is_degraded());
    assert_eq!(voxelizer.grid().occupied_count(0), 512);
    assert_eq!(voxelizer.grid().occupied_count(1), 64);
    assert_eq!(voxelizer.grid().occupied_count(2), 8);
}

#[test]
fn unit_cube_surface_is_a_one_cell_shell() {
    for method in ProjectionMethod::ALL {
        let config = unit_cube_config(VoxelizeMode::Surface).with_method(method);
        let (voxelizer, report) = run(&Mesh::cube(1.0), config);
        assert_eq!(report.surface_cells, 296, "{method:?}");
        assert_eq!(report.interior_cells, 0, "{method:?}");

        let base = voxelizer.grid().base();
        for z in 1..7 {
            for y in 1..7 {
                for x in 1..7 {
                    assert_eq!(base.get(CellPos::new(x, y, z)), Occupancy::Empty);
                }
            }
        }
        assert_eq!(base.get(CellPos::new(0, 3, 5)), Occupancy::Surface);
        assert_eq!(base.get(CellPos::new(7, 7, 7)), Occupancy::Surface);
    }
}

#[test]
fn zero_area_triangle_produces_nothing() {
    let points = [Vec3::ZERO, Vec3::ONE, Vec3::splat(2.0)];
    let mesh = Mesh::from_positions(&points, vec![0, 1, 2]).unwrap();
    assert!(mesh.bounds().radius > 0.0);

    for method in ProjectionMethod::ALL {
        let config = VoxelizerConfig::new(16)
            .with_mode(VoxelizeMode::Solid)
            .with_method(method);
        let (voxelizer, report) = run(&mesh, config);
        assert_eq!(report.skipped_triangles, 1);
        assert_eq!(report.crossings, 0);
        assert_eq!(voxelizer.kbuffer_crossings(), 0);
        for level in 0..voxelizer.grid().level_count() {
            assert_eq!(voxelizer.grid().occupied_count(level), 0);
        }
    }
}

#[test]
fn empty_mesh_gives_an_empty_pyramid() {
    let mesh = Mesh::from_positions(&[], Vec::new()).unwrap();
    let config = VoxelizerConfig::new(16).with_mode(VoxelizeMode::Solid);
    let (voxelizer, report) = run(&mesh, config);
    assert_eq!(report.triangles, 0);
    assert_eq!(report.occupied_cells(), 0);
    for level in 0..voxelizer.grid().level_count() {
        assert_eq!(voxelizer.grid().level(level).unwrap().iter_occupied().count(), 0);
    }
}

#[test]
fn revoxelizing_is_bit_identical() {
    let mesh = Mesh::torus(1.0, 0.35, 48, 24);
    let config = VoxelizerConfig::new(32).with_mode(VoxelizeMode::Solid);

    let mut voxelizer = Voxelizer::new(config.clone()).unwrap();
    let first_report = voxelizer.voxelize(&mesh);
    let first = snapshot(voxelizer.grid());
    let second_report = voxelizer.voxelize(&mesh);
    assert_eq!(first, snapshot(voxelizer.grid()));
    assert_eq!(first_report, second_report);

    let (other, _) = run(&mesh, config);
    assert_eq!(first, snapshot(other.grid()));
}

#[test]
fn closed_meshes_have_paired_crossings() {
    let meshes = [
        ("cube", Mesh::cube(0.8)),
        ("sphere", Mesh::uv_sphere(1.0, 32, 16)),
        ("torus", Mesh::torus(1.0, 0.4, 32, 16)),
        ("tetrahedron", Mesh::tetrahedron(1.0)),
    ];
    for (name, mesh) in meshes {
        let config = VoxelizerConfig::new(32).with_mode(VoxelizeMode::Solid);
        let (voxelizer, report) = run(&mesh, config);
        assert_eq!(report.unpaired_columns, 0, "{name}");
        assert_eq!(report.unresolved_columns, 0, "{name}");
        assert!(report.interior_cells > 0, "{name}");
        for y in 0..32 {
            for x in 0..32 {
                let crossings = voxelizer.column_crossings(x, y).unwrap();
                assert_eq!(crossings % 2, 0, "{name} column ({x}, {y})");
            }
        }
    }
}

#[test]
fn solid_sphere_volume_is_close_to_analytic() {
    let mesh = Mesh::uv_sphere(2.5, 48, 24);
    let config = VoxelizerConfig::new(32).with_mode(VoxelizeMode::Solid);
    let (voxelizer, report) = run(&mesh, config);

    // Radius maps to 16 cells.
    let analytic = 4.0 / 3.0 * std::f64::consts::PI * 16.0_f64.powi(3);
    let occupied = report.occupied_cells() as f64;
    assert!(occupied > analytic * 0.9, "{occupied} vs {analytic}");
    assert!(occupied < analytic * 1.35, "{occupied} vs {analytic}");

    let base = voxelizer.grid().base();
    assert_eq!(base.get(CellPos::new(16, 16, 16)), Occupancy::Interior);
    assert_eq!(base.get(CellPos::new(0, 0, 0)), Occupancy::Empty);
    assert_eq!(base.get(CellPos::new(31, 31, 0)), Occupancy::Empty);
}

#[test]
fn torus_keeps_its_hole() {
    let mesh = Mesh::torus(1.0, 0.35, 48, 24);
    let config = VoxelizerConfig::new(32).with_mode(VoxelizeMode::Solid);
    let (voxelizer, report) = run(&mesh, config);
    assert!(!report.is_degraded());

    let base = voxelizer.grid().base();
    assert_eq!(base.get(CellPos::new(16, 16, 16)), Occupancy::Empty);
    assert!(base.get(CellPos::new(16, 16, 27)).is_occupied());
    assert!(base.get(CellPos::new(16, 16, 4)).is_occupied());
}

#[test]
fn mip_levels_are_max_pools_of_their_children() {
    let mesh = Mesh::uv_sphere(1.0, 24, 12);
    let config = VoxelizerConfig::new(16).with_mode(VoxelizeMode::Solid);
    let (voxelizer, _) = run(&mesh, config);
    let grid = voxelizer.grid();
    assert_eq!(grid.level_count(), 4);

    for level in 1..grid.level_count() {
        let fine = grid.level(level - 1).unwrap();
        let coarse = grid.level(level).unwrap();
        let side = coarse.side();
        assert_eq!(side * 2, fine.side());
        for index in 0..(side as usize).pow(3) {
            let pos = CellPos::from_index(index, side);
            let children = pos.children().map(|child| fine.get(child));
            let any = children.iter().any(|c| c.is_occupied());
            let strongest = children.iter().copied().max().unwrap();
            assert_eq!(coarse.get(pos).is_occupied(), any, "level {level} {pos:?}");
            assert_eq!(coarse.get(pos), strongest);
        }
    }
}

#[test]
fn single_slot_kbuffer_peels_to_the_same_grid() {
    let mesh = Mesh::torus(1.0, 0.35, 32, 16);
    let wide = VoxelizerConfig::new(32)
        .with_mode(VoxelizeMode::Solid)
        .with_kbuffer_slots(8);
    let narrow = wide.clone().with_kbuffer_slots(1).with_max_peel_passes(16);

    let (reference, wide_report) = run(&mesh, wide);
    let (peeled, narrow_report) = run(&mesh, narrow);

    assert_eq!(wide_report.peel_passes, 1);
    assert!(narrow_report.peel_passes >= 4);
    assert_eq!(narrow_report.unresolved_columns, 0);
    assert_eq!(narrow_report.crossings, wide_report.crossings);
    assert_eq!(snapshot(reference.grid()), snapshot(peeled.grid()));
}

#[test]
fn pass_limit_degrades_but_completes() {
    let mesh = Mesh::torus(1.0, 0.35, 32, 16);
    let full = VoxelizerConfig::new(32).with_mode(VoxelizeMode::Solid);
    let limited = full.clone().with_kbuffer_slots(1).with_max_peel_passes(1);

    let (_, full_report) = run(&mesh, full);
    let (_, limited_report) = run(&mesh, limited);

    assert_eq!(limited_report.peel_passes, 1);
    assert!(limited_report.unresolved_columns > 0);
    assert!(limited_report.is_degraded());
    assert_eq!(limited_report.surface_cells, full_report.surface_cells);
    assert!(limited_report.interior_cells < full_report.interior_cells);
}

#[test]
fn open_surface_reports_unpaired_columns() {
    let points = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    let mesh = Mesh::from_positions(&points, vec![0, 1, 2]).unwrap();
    let config = VoxelizerConfig::new(16).with_mode(VoxelizeMode::Solid);
    let (_, report) = run(&mesh, config);

    assert!(report.unpaired_columns > 0);
    assert!(report.is_degraded());
    assert_eq!(report.interior_cells, 0);
    assert!(report.surface_cells > 0);
}

#[test]
fn rigid_motion_keeps_the_shell() {
    // Exact quarter turn about z followed by a translation.
    let model = Mat4::from_cols(
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(-1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(5.0, -3.0, 2.0, 1.0),
    );
    let mut voxelizer = Voxelizer::new(unit_cube_config(VoxelizeMode::Solid)).unwrap();
    let report = voxelizer.voxelize_transformed(&Mesh::cube(1.0), model);
    assert_eq!(report.surface_cells, 296);
    assert_eq!(report.interior_cells, 216);
}
