//! Built-in example graphs
//!
//! Small kernels commonly used to sanity-check pebbling bounds: accumulation
//! chains (`sample*`), radix-2 FFT butterflies, a 3x3 Jacobi-2D stencil step
//! (as one wide node per output, or expanded into binary operations) and
//! 2x2 to 4x4 matrix multiplications. Rows use the dependency-table convention of
//! 1-based predecessor numbers with `0` for unused slots.

use crate::dag::DependencyTable;
use crate::parse::{NamedTable, ParseError};

const SAMPLE3: &[&[u32]] = &[
    &[0, 0], // A
    &[0, 0], // B
    &[1, 2], // A + B
];

const SAMPLE5: &[&[u32]] = &[
    &[0, 0], // A
    &[0, 0], // B
    &[1, 2], // A + B
    &[3, 2], // A + 2B
    &[1, 3], // 2A + B
];

const SAMPLE6: &[&[u32]] = &[
    &[0, 0], // A
    &[0, 0], // B
    &[1, 2], // A + B
    &[3, 2], // A + 2B
    &[1, 3], // 2A + B
    &[4, 5], // 3A + 3B
];

const SAMPLE11: &[&[u32]] = &[
    &[0, 0],  // S
    &[0, 0],  // A
    &[0, 0],  // B1
    &[0, 0],  // B2
    &[0, 0],  // B3
    &[2, 3],  // AB1
    &[2, 4],  // AB2
    &[2, 5],  // AB3
    &[1, 6],  // S + AB1
    &[9, 7],  // S + AB1 + AB2
    &[8, 10], // S + AB1 + AB2 + AB3
];

const SAMPLE14: &[&[u32]] = &[
    &[0, 0],   // S
    &[0, 0],   // A
    &[0, 0],   // B1
    &[0, 0],   // B2
    &[0, 0],   // B3
    &[0, 0],   // B4
    &[2, 3],   // AB1
    &[2, 4],   // AB2
    &[2, 5],   // AB3
    &[2, 6],   // AB4
    &[1, 7],   // S + AB1
    &[8, 11],  // S + AB1 + AB2
    &[9, 12],  // S + AB1 + AB2 + AB3
    &[10, 13], // S + AB1 + AB2 + AB3 + AB4
];

const FFT4: &[&[u32]] = &[
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[1, 2],
    &[1, 2],
    &[3, 4],
    &[3, 4],
    &[5, 7],
    &[6, 8],
    &[5, 7],
    &[6, 8],
];

const FFT8: &[&[u32]] = &[
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    // stage 1
    &[1, 2],
    &[1, 2],
    &[3, 4],
    &[3, 4],
    &[5, 6],
    &[5, 6],
    &[7, 8],
    &[7, 8],
    // stage 2
    &[9, 11],
    &[10, 12],
    &[9, 11],
    &[10, 12],
    &[13, 15],
    &[14, 16],
    &[13, 15],
    &[14, 16],
    // stage 3
    &[17, 21],
    &[18, 22],
    &[19, 23],
    &[20, 24],
    &[21, 17],
    &[22, 18],
    &[23, 19],
    &[24, 20],
];

const JACOBI2D: &[&[u32]] = &[
    &[0, 0, 0, 0, 0, 0, 0], // c1
    &[0, 0, 0, 0, 0, 0, 0], // c2
    &[0, 0, 0, 0, 0, 0, 0], // A[0, 0]
    &[0, 0, 0, 0, 0, 0, 0], // A[0, 1]
    &[0, 0, 0, 0, 0, 0, 0], // A[0, 2]
    &[0, 0, 0, 0, 0, 0, 0], // A[1, 0]
    &[0, 0, 0, 0, 0, 0, 0], // A[1, 1]
    &[0, 0, 0, 0, 0, 0, 0], // A[1, 2]
    &[0, 0, 0, 0, 0, 0, 0], // A[2, 0]
    &[0, 0, 0, 0, 0, 0, 0], // A[2, 1]
    &[0, 0, 0, 0, 0, 0, 0], // A[2, 2]
    &[1, 2, 3, 4, 6, 0, 0],   // B[0, 0]
    &[1, 2, 3, 4, 5, 7, 0],   // B[0, 1]
    &[1, 2, 4, 5, 8, 0, 0],   // B[0, 2]
    &[1, 2, 3, 6, 7, 9, 0],   // B[1, 0]
    &[1, 2, 4, 6, 7, 8, 10],  // B[1, 1]
    &[1, 2, 5, 7, 8, 11, 0],  // B[1, 2]
    &[1, 2, 6, 8, 9, 0, 0],   // B[2, 0]
    &[1, 2, 7, 9, 10, 11, 0], // B[2, 1]
    &[1, 2, 8, 10, 11, 0, 0], // B[2, 2]
];

const MATMULT2: &[&[u32]] = &[
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[1, 5],
    &[9, 10],
    &[2, 7],
    &[11, 12],
    &[0, 0],
    &[1, 6],
    &[14, 15],
    &[2, 8],
    &[16, 17],
    &[0, 0],
    &[3, 5],
    &[19, 20],
    &[4, 7],
    &[21, 22],
    &[0, 0],
    &[3, 6],
    &[24, 25],
    &[4, 8],
    &[26, 27],
];

const MATMULT2_SIMPLE: &[&[u32]] = &[
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[0, 0],
    &[1, 5],
    &[0, 9],
    &[2, 7],
    &[10, 11],
    &[1, 6],
    &[0, 13],
    &[2, 8],
    &[14, 15],
    &[3, 5],
    &[0, 17],
    &[4, 7],
    &[18, 19],
    &[3, 6],
    &[0, 21],
    &[4, 8],
    &[22, 23],
];

#[rustfmt::skip]
const MATMULT3: &[&[u32]] = &[
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[1, 10], &[19, 20], &[2, 13], &[21, 22], &[3, 16],
    &[23, 24], &[0, 0], &[1, 11], &[26, 27], &[2, 14], &[28, 29],
    &[3, 17], &[30, 31], &[0, 0], &[1, 12], &[33, 34], &[2, 15],
    &[35, 36], &[3, 18], &[37, 38], &[0, 0], &[4, 10], &[40, 41],
    &[5, 13], &[42, 43], &[6, 16], &[44, 45], &[0, 0], &[4, 11],
    &[47, 48], &[5, 14], &[49, 50], &[6, 17], &[51, 52], &[0, 0],
    &[4, 12], &[54, 55], &[5, 15], &[56, 57], &[6, 18], &[58, 59],
    &[0, 0], &[7, 10], &[61, 62], &[8, 13], &[63, 64], &[9, 16],
    &[65, 66], &[0, 0], &[7, 11], &[68, 69], &[8, 14], &[70, 71],
    &[9, 17], &[72, 73], &[0, 0], &[7, 12], &[75, 76], &[8, 15],
    &[77, 78], &[9, 18], &[79, 80],
];

#[rustfmt::skip]
const MATMULT3_SIMPLE: &[&[u32]] = &[
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[1, 10], &[0, 19], &[2, 13], &[20, 21], &[3, 16], &[22, 23],
    &[1, 11], &[0, 25], &[2, 14], &[26, 27], &[3, 17], &[28, 29],
    &[1, 12], &[0, 31], &[2, 15], &[32, 33], &[3, 18], &[34, 35],
    &[4, 10], &[0, 37], &[5, 13], &[38, 39], &[6, 16], &[40, 41],
    &[4, 11], &[0, 43], &[5, 14], &[44, 45], &[6, 17], &[46, 47],
    &[4, 12], &[0, 49], &[5, 15], &[50, 51], &[6, 18], &[52, 53],
    &[7, 10], &[0, 55], &[8, 13], &[56, 57], &[9, 16], &[58, 59],
    &[7, 11], &[0, 61], &[8, 14], &[62, 63], &[9, 17], &[64, 65],
    &[7, 12], &[0, 67], &[8, 15], &[68, 69], &[9, 18], &[70, 71],
];

#[rustfmt::skip]
const MATMULT4: &[&[u32]] = &[
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[1, 17], &[33, 34], &[2, 21],
    &[35, 36], &[3, 25], &[37, 38], &[4, 29], &[39, 40], &[0, 0],
    &[1, 18], &[42, 43], &[2, 22], &[44, 45], &[3, 26], &[46, 47],
    &[4, 30], &[48, 49], &[0, 0], &[1, 19], &[51, 52], &[2, 23],
    &[53, 54], &[3, 27], &[55, 56], &[4, 31], &[57, 58], &[0, 0],
    &[1, 20], &[60, 61], &[2, 24], &[62, 63], &[3, 28], &[64, 65],
    &[4, 32], &[66, 67], &[0, 0], &[5, 17], &[69, 70], &[6, 21],
    &[71, 72], &[7, 25], &[73, 74], &[8, 29], &[75, 76], &[0, 0],
    &[5, 18], &[78, 79], &[6, 22], &[80, 81], &[7, 26], &[82, 83],
    &[8, 30], &[84, 85], &[0, 0], &[5, 19], &[87, 88], &[6, 23],
    &[89, 90], &[7, 27], &[91, 92], &[8, 31], &[93, 94], &[0, 0],
    &[5, 20], &[96, 97], &[6, 24], &[98, 99], &[7, 28], &[100, 101],
    &[8, 32], &[102, 103], &[0, 0], &[9, 17], &[105, 106], &[10, 21],
    &[107, 108], &[11, 25], &[109, 110], &[12, 29], &[111, 112], &[0, 0],
    &[9, 18], &[114, 115], &[10, 22], &[116, 117], &[11, 26], &[118, 119],
    &[12, 30], &[120, 121], &[0, 0], &[9, 19], &[123, 124], &[10, 23],
    &[125, 126], &[11, 27], &[127, 128], &[12, 31], &[129, 130], &[0, 0],
    &[9, 20], &[132, 133], &[10, 24], &[134, 135], &[11, 28], &[136, 137],
    &[12, 32], &[138, 139], &[0, 0], &[13, 17], &[141, 142], &[14, 21],
    &[143, 144], &[15, 25], &[145, 146], &[16, 29], &[147, 148], &[0, 0],
    &[13, 18], &[150, 151], &[14, 22], &[152, 153], &[15, 26], &[154, 155],
    &[16, 30], &[156, 157], &[0, 0], &[13, 19], &[159, 160], &[14, 23],
    &[161, 162], &[15, 27], &[163, 164], &[16, 31], &[165, 166], &[0, 0],
    &[13, 20], &[168, 169], &[14, 24], &[170, 171], &[15, 28], &[172, 173],
    &[16, 32], &[174, 175],
];

#[rustfmt::skip]
const JACOBI2D_EXT: &[&[u32]] = &[
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0],
    &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[0, 0], &[1, 4],
    &[1, 6], &[12, 13], &[2, 3], &[14, 15], &[1, 3], &[1, 5],
    &[17, 18], &[1, 7], &[19, 20], &[2, 4], &[21, 22], &[1, 4],
    &[1, 8], &[24, 25], &[2, 5], &[26, 27], &[1, 3], &[1, 7],
    &[29, 30], &[1, 9], &[31, 32], &[2, 6], &[33, 34], &[1, 4],
    &[1, 6], &[36, 37], &[1, 8], &[38, 39], &[1, 10], &[40, 41],
    &[2, 7], &[42, 43], &[1, 5], &[1, 7], &[45, 46], &[1, 11],
    &[47, 48], &[2, 8], &[49, 50], &[1, 2], &[1, 6], &[52, 53],
    &[1, 8], &[54, 55], &[1, 9], &[56, 57], &[2, 9], &[58, 59],
    &[1, 7], &[1, 9], &[61, 62], &[1, 11], &[63, 64], &[2, 10],
    &[65, 66], &[1, 8], &[1, 10], &[68, 69], &[2, 11], &[70, 71],
];

const GRAPHS: &[(&str, usize, &[&[u32]])] = &[
    ("sample3", 2, SAMPLE3),
    ("sample5", 2, SAMPLE5),
    ("sample6", 2, SAMPLE6),
    ("sample11", 2, SAMPLE11),
    ("sample14", 2, SAMPLE14),
    ("fft4", 2, FFT4),
    ("fft8", 2, FFT8),
    ("jacobi2d", 7, JACOBI2D),
    ("matmult2", 2, MATMULT2),
    ("matmult2_simple", 2, MATMULT2_SIMPLE),
    ("matmult3", 2, MATMULT3),
    ("matmult3_simple", 2, MATMULT3_SIMPLE),
    ("matmult4", 2, MATMULT4),
    ("jacobi2d-ext", 2, JACOBI2D_EXT),
];

/// Graph used when none is named.
pub const DEFAULT_GRAPH: &str = "fft4";

pub fn names() -> impl Iterator<Item = &'static str> {
    GRAPHS.iter().map(|(name, _, _)| *name)
}

/// Look up a built-in graph by name.
pub fn lookup(name: &str) -> Result<NamedTable, ParseError> {
    let (_, max_deps, rows) = GRAPHS
        .iter()
        .find(|(candidate, _, _)| *candidate == name)
        .ok_or_else(|| {
            ParseError::UnknownGraph(name.to_string(), names().collect::<Vec<_>>().join(", "))
        })?;
    let rows = rows.iter().map(|row| row.to_vec()).collect();
    Ok(NamedTable {
        name: name.to_string(),
        table: DependencyTable::new(*max_deps, rows)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Dag;

    #[test]
    fn test_every_graph_builds() {
        for name in names() {
            let named = lookup(name).unwrap();
            let dag = Dag::from_table(&named.table)
                .unwrap_or_else(|e| panic!("{} should build: {}", name, e));
            assert!(!dag.inputs().is_empty(), "{} has no inputs", name);
            assert!(!dag.outputs().is_empty(), "{} has no outputs", name);
        }
    }

    #[test]
    fn test_fft_shapes() {
        let fft4 = Dag::from_table(&lookup("fft4").unwrap().table).unwrap();
        assert_eq!(fft4.len(), 12);
        assert_eq!(fft4.inputs().len(), 4);
        assert_eq!(fft4.outputs().len(), 4);
        assert_eq!(fft4.depth(), 2);

        let fft8 = Dag::from_table(&lookup("fft8").unwrap().table).unwrap();
        assert_eq!(fft8.len(), 32);
        assert_eq!(fft8.edge_count(), 48);
        assert_eq!(fft8.depth(), 3);
    }

    #[test]
    fn test_larger_kernels() {
        let shapes = [
            ("matmult3", 81, 27),
            ("matmult3_simple", 72, 18),
            ("matmult4", 176, 48),
            ("jacobi2d-ext", 72, 11),
        ];
        for (name, len, inputs) in shapes {
            let dag = Dag::from_table(&lookup(name).unwrap().table).unwrap();
            assert_eq!(dag.len(), len, "{}", name);
            assert_eq!(dag.inputs().len(), inputs, "{}", name);
        }
        assert_eq!(names().count(), 14);
    }

    #[test]
    fn test_unknown_graph() {
        let err = lookup("fft16").unwrap_err();
        assert!(err.to_string().contains("fft4"));
    }

    #[test]
    fn test_default_is_known() {
        assert!(names().any(|n| n == DEFAULT_GRAPH));
    }
}
