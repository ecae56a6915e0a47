pub mod channel_queue;
pub mod dsp;
pub mod ring_buffer;
