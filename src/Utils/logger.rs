use crate::numerical::Schrodinger::potential::Trajectory;
use csv::Writer;
use nalgebra::{DMatrix, DVector};
use std::fs::File;
use std::path::Path;

/// Writes `matrix` as CSV with the grid `x_mesh` as the first column.
pub fn save_matrix_to_csv(
    matrix: &DMatrix<f64>,
    headers: &[&str],
    filename: &Path,
    x_mesh: &DVector<f64>,
    arg: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if matrix.nrows() != x_mesh.len() {
        return Err(format!(
            "matrix has {} rows, mesh has {} points",
            matrix.nrows(),
            x_mesh.len()
        )
        .into());
    }
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);

    let mut headers_with_x = vec![arg.to_string()];
    headers_with_x.extend(headers.iter().map(|h| h.to_string()));
    writer.write_record(&headers_with_x)?;

    for (i, row) in matrix.row_iter().enumerate() {
        let mut row_data = vec![x_mesh[i].to_string()];
        row_data.extend(row.iter().map(|&val| val.to_string()));
        writer.write_record(&row_data)?;
    }

    writer.flush()?;
    Ok(())
}

/// CSV with header `y,psi,dpsi`
pub fn save_trajectory_to_csv(
    trajectory: &Trajectory,
    filename: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let states = trajectory.to_matrix().columns(1, 2).into_owned();
    save_matrix_to_csv(&states, &["psi", "dpsi"], filename, &trajectory.y, "y")
}
