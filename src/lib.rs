pub mod net;
pub mod pfc;
pub mod queue;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
