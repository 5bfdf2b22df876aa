//! Everything that talks to, or is shaped by, the Slurm workload manager

/// Queues (partitions) and their node count and time limits
pub mod partition;

/// Wall-clock durations in Slurm's `[D-]HH:MM:SS` notation
pub mod walltime;

/// Live queries and job submission through sinfo and sbatch
pub mod scheduler;

/// Render job script templates and write them to the working directory
pub mod job;
