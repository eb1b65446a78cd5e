mod globset;
mod replica_sets;
mod scenarios;
