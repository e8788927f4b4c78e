//! Mock inference backend for testing the segmentation path
//!
//! Lets tests drive preprocessing and mask post-processing without a model
//! file or ONNX Runtime.

use crate::{
    error::{PhotoError, Result},
    inference::InferenceBackend,
};
use ndarray::Array4;
use std::sync::{Arc, Mutex};

/// How the mock fills its output tensor
#[derive(Debug, Clone, Copy)]
pub enum MockOutput {
    /// Every value set to the given constant
    Constant(f32),
    /// 1.0 inside the centered square covering half of each side, 0.0 elsewhere
    CenteredSquare,
    /// Tensor with a wrong channel layout
    Malformed,
}

/// Mock backend returning a configurable output tensor
#[derive(Debug, Clone)]
pub struct MockBackend {
    input_size: u32,
    output: MockOutput,
    should_fail: bool,
    call_history: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl MockBackend {
    #[must_use]
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size,
            output: MockOutput::CenteredSquare,
            should_fail: false,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: MockOutput) -> Self {
        self.output = output;
        self
    }

    /// Create a mock backend that fails every inference call
    #[must_use]
    pub fn new_failing(input_size: u32) -> Self {
        let mut backend = Self::new(input_size);
        backend.should_fail = true;
        backend
    }

    /// Shared record of input shapes seen by `infer`
    #[must_use]
    pub fn call_history(&self) -> Arc<Mutex<Vec<Vec<usize>>>> {
        Arc::clone(&self.call_history)
    }
}

impl InferenceBackend for MockBackend {
    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(input.shape().to_vec());
        }

        if self.should_fail {
            return Err(PhotoError::processing("Mock inference failure"));
        }

        let size = self.input_size as usize;
        let output = match self.output {
            MockOutput::Constant(value) => Array4::<f32>::from_elem((1, 1, size, size), value),
            MockOutput::CenteredSquare => {
                let (start, end) = (size / 4, size - size / 4);
                Array4::<f32>::from_shape_fn((1, 1, size, size), |(_, _, y, x)| {
                    if (start..end).contains(&y) && (start..end).contains(&x) {
                        1.0
                    } else {
                        0.0
                    }
                })
            },
            MockOutput::Malformed => Array4::<f32>::zeros((1, 0, size, size)),
        };
        Ok(output)
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn name(&self) -> &str {
        "mock-backend"
    }
}
