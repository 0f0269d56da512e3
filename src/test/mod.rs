mod queues;
mod simulator;
