//! Execution provider selection and metadata.
//!
//! Acceleration is always best effort: a requested provider that is not
//! available is logged and skipped, and the session runs on the CPU.

use crate::config::InferenceDevice;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider,
    ExecutionProviderDispatch, NNAPIExecutionProvider, XNNPACKExecutionProvider,
};
use tracing::{debug, info, warn};

/// Metadata for an inference device.
pub struct ProviderMetadata {
    /// CLI/config identifier (e.g., "nnapi").
    pub id: &'static str,
    /// Display name (e.g., "NNAPI").
    pub name: &'static str,
    /// Full description for human output.
    pub description: &'static str,
}

/// Get metadata for an inference device.
#[must_use]
pub fn provider_metadata(device: InferenceDevice) -> ProviderMetadata {
    match device {
        InferenceDevice::Auto => ProviderMetadata {
            id: "auto",
            name: "Auto",
            description: "Auto (best available accelerator, CPU fallback)",
        },
        InferenceDevice::Cpu => ProviderMetadata {
            id: "cpu",
            name: "CPU",
            description: "CPU (always available)",
        },
        InferenceDevice::Nnapi => ProviderMetadata {
            id: "nnapi",
            name: "NNAPI",
            description: "NNAPI (Android neural accelerator)",
        },
        InferenceDevice::Xnnpack => ProviderMetadata {
            id: "xnnpack",
            name: "XNNPACK",
            description: "XNNPACK (optimized CPU for ARM/x86)",
        },
        InferenceDevice::CoreMl => ProviderMetadata {
            id: "coreml",
            name: "CoreML",
            description: "CoreML (Apple GPU/Neural Engine)",
        },
        InferenceDevice::Cuda => ProviderMetadata {
            id: "cuda",
            name: "CUDA",
            description: "CUDA (NVIDIA GPU acceleration)",
        },
    }
}

/// Accelerators tried by [`InferenceDevice::Auto`], in priority order.
const AUTO_PRIORITY: [InferenceDevice; 3] = [
    InferenceDevice::Nnapi,
    InferenceDevice::CoreMl,
    InferenceDevice::Xnnpack,
];

/// Whether the runtime reports the device's provider as usable.
///
/// The CPU is always available; `Auto` is available because it can fall back.
#[must_use]
pub fn is_device_available(device: InferenceDevice) -> bool {
    if matches!(device, InferenceDevice::Auto | InferenceDevice::Cpu) {
        return true;
    }

    // The probe loads the runtime library, which panics if it is missing.
    let probe = std::panic::catch_unwind(|| match device {
        InferenceDevice::Nnapi => NNAPIExecutionProvider::default().is_available(),
        InferenceDevice::Xnnpack => XNNPACKExecutionProvider::default().is_available(),
        InferenceDevice::CoreMl => CoreMLExecutionProvider::default().is_available(),
        InferenceDevice::Cuda => CUDAExecutionProvider::default().is_available(),
        InferenceDevice::Auto | InferenceDevice::Cpu => Ok(true),
    });

    match probe {
        Ok(Ok(available)) => available,
        Ok(Err(e)) => {
            debug!("Availability probe for {device:?} failed: {e}");
            false
        }
        Err(_) => {
            debug!("Availability probe for {device:?} panicked");
            false
        }
    }
}

/// Resolve the requested device to the execution providers to register.
///
/// Returns the providers and a label for the device actually selected.
/// An empty list means default CPU execution.
pub fn select_execution_providers(
    device: InferenceDevice,
) -> (Vec<ExecutionProviderDispatch>, &'static str) {
    match device {
        InferenceDevice::Cpu => {
            info!("Requested device: CPU");
            (Vec::new(), "CPU")
        }
        InferenceDevice::Auto => {
            if let Some(&candidate) = AUTO_PRIORITY.iter().find(|d| is_device_available(**d)) {
                let name = provider_metadata(candidate).name;
                info!("Auto mode: {name} available, attempting acceleration");
                (dispatch_for(candidate).into_iter().collect(), name)
            } else {
                info!("Auto mode: no accelerator available, using CPU");
                (Vec::new(), "Auto (CPU)")
            }
        }
        explicit => {
            let name = provider_metadata(explicit).name;
            if is_device_available(explicit) {
                info!("Requested device: {name}");
                (dispatch_for(explicit).into_iter().collect(), name)
            } else {
                warn!("{name} requested but not available, falling back to CPU");
                (Vec::new(), "CPU (fallback)")
            }
        }
    }
}

/// Build the provider registration for an accelerator.
///
/// Registration failures are not fatal: the dispatch is left without
/// `error_on_failure`, so ORT continues on the CPU.
fn dispatch_for(device: InferenceDevice) -> Option<ExecutionProviderDispatch> {
    match device {
        InferenceDevice::Auto | InferenceDevice::Cpu => None,
        InferenceDevice::Nnapi => Some(NNAPIExecutionProvider::default().build()),
        InferenceDevice::Xnnpack => Some(XNNPACKExecutionProvider::default().build()),
        InferenceDevice::CoreMl => Some(CoreMLExecutionProvider::default().build()),
        InferenceDevice::Cuda => Some(CUDAExecutionProvider::default().build()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_metadata_returns_expected_values() {
        let test_cases = [
            (InferenceDevice::Auto, "auto", "Auto", "fallback"),
            (InferenceDevice::Cpu, "cpu", "CPU", "CPU"),
            (InferenceDevice::Nnapi, "nnapi", "NNAPI", "Android"),
            (InferenceDevice::Xnnpack, "xnnpack", "XNNPACK", "CPU"),
            (InferenceDevice::CoreMl, "coreml", "CoreML", "Apple"),
            (InferenceDevice::Cuda, "cuda", "CUDA", "NVIDIA"),
        ];

        for (device, expected_id, expected_name, desc_keyword) in test_cases {
            let meta = provider_metadata(device);
            assert_eq!(meta.id, expected_id, "ID mismatch for {device:?}");
            assert_eq!(meta.name, expected_name, "Name mismatch for {device:?}");
            assert!(
                meta.description.contains(desc_keyword),
                "Description for {device:?} should contain '{desc_keyword}'"
            );
        }
    }

    #[test]
    fn test_cpu_selects_no_providers() {
        let (providers, label) = select_execution_providers(InferenceDevice::Cpu);
        assert!(providers.is_empty());
        assert_eq!(label, "CPU");
    }

    #[test]
    fn test_cpu_and_auto_always_available() {
        assert!(is_device_available(InferenceDevice::Cpu));
        assert!(is_device_available(InferenceDevice::Auto));
    }

    #[test]
    fn test_metadata_ids_parse_back() {
        for device in [
            InferenceDevice::Auto,
            InferenceDevice::Cpu,
            InferenceDevice::Nnapi,
            InferenceDevice::Xnnpack,
            InferenceDevice::CoreMl,
            InferenceDevice::Cuda,
        ] {
            let id = provider_metadata(device).id;
            assert_eq!(id.parse::<InferenceDevice>().ok(), Some(device));
        }
    }
}
