//! Built-in templates seeded on first run.

use std::collections::BTreeMap;

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The starter set of submission templates. Keys are sbatch/srun long
/// option names; the empty-string "mode" value picks batch vs
/// interactive in the composer.
pub fn default_templates() -> Vec<(&'static str, BTreeMap<String, String>)> {
    vec![
        (
            "Quick CPU Job",
            params(&[
                ("mode", "sbatch"),
                ("job-name", "quick-test"),
                ("time", "00:30:00"),
                ("nodes", "1"),
                ("ntasks", "1"),
                ("cpus-per-task", "1"),
                ("mem", "4G"),
                ("output", "%x-%j.out"),
                ("error", "%x-%j.err"),
            ]),
        ),
        (
            "Multi-Node MPI",
            params(&[
                ("mode", "sbatch"),
                ("job-name", "mpi-job"),
                ("time", "04:00:00"),
                ("nodes", "4"),
                ("ntasks", "16"),
                ("cpus-per-task", "1"),
                ("mem", "8G"),
                ("output", "%x-%j.out"),
                ("error", "%x-%j.err"),
            ]),
        ),
        (
            "Single GPU Training",
            params(&[
                ("mode", "sbatch"),
                ("job-name", "gpu-training"),
                ("time", "08:00:00"),
                ("nodes", "1"),
                ("ntasks", "1"),
                ("cpus-per-task", "4"),
                ("mem", "32G"),
                ("gres", "gpu:1"),
                ("output", "%x-%j.out"),
                ("error", "%x-%j.err"),
            ]),
        ),
        (
            "Large Memory Job",
            params(&[
                ("mode", "sbatch"),
                ("job-name", "highmem-job"),
                ("time", "12:00:00"),
                ("nodes", "1"),
                ("ntasks", "1"),
                ("cpus-per-task", "8"),
                ("mem", "128G"),
                ("output", "%x-%j.out"),
                ("error", "%x-%j.err"),
            ]),
        ),
        (
            "Interactive Session",
            params(&[
                ("mode", "srun"),
                ("time", "01:00:00"),
                ("nodes", "1"),
                ("ntasks", "1"),
                ("cpus-per-task", "2"),
                ("mem", "8G"),
            ]),
        ),
    ]
}
