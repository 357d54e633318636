use image::{DynamicImage, Rgba};
use kitfusion_contracts::errors::GenerationFailure;
use kitfusion_contracts::media::RESULT_IMAGE_MIME;
use kitfusion_contracts::response::{extract_result, GenerationResponse, ResponsePart};
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{FusionRequest, FusionResponse, GenerationClient};
use crate::map_object;
use crate::media::{decode_payload_image, encode_png, payload_from_bytes};

const REFUSE_MARKER: &str = "[refuse]";
const TINT_WEIGHT: f32 = 0.25;

/// Offline client: tints the person image with a colour derived from the
/// instruction. Goes through the same response extraction as the network
/// client.
pub struct DryrunClient;

impl GenerationClient for DryrunClient {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn fuse(&self, request: &FusionRequest) -> Result<FusionResponse, GenerationFailure> {
        let parts = if request.instruction.contains(REFUSE_MARKER) {
            vec![ResponsePart::Text(
                "The dryrun client declined this request.".to_string(),
            )]
        } else {
            let png = render_fusion(request)?;
            vec![
                ResponsePart::Text("dryrun fusion".to_string()),
                ResponsePart::Image(payload_from_bytes(&png, RESULT_IMAGE_MIME)),
            ]
        };
        let response = GenerationResponse::from_candidates(vec![parts]);
        let image = extract_result(&response)?;
        Ok(FusionResponse {
            image,
            provider_request: map_object(json!({
                "endpoint": "dryrun-native",
                "payload": {
                    "instruction": request.instruction,
                    "person_mime": request.person.mime(),
                    "garment_mime": request.garment.mime(),
                },
            })),
            provider_response: map_object(json!({
                "candidates": response.candidates.len(),
                "parts": response.part_count(),
            })),
        })
    }
}

fn render_fusion(request: &FusionRequest) -> Result<Vec<u8>, GenerationFailure> {
    let person = decode_payload_image(&request.person).map_err(|err| {
        GenerationFailure::transport(format!("dryrun could not decode person image: {err:#}"))
    })?;
    let (r, g, b) = color_from_instruction(&request.instruction);
    let mut canvas = person.to_rgba8();
    for pixel in canvas.pixels_mut() {
        let Rgba([pr, pg, pb, pa]) = *pixel;
        *pixel = Rgba([blend(pr, r), blend(pg, g), blend(pb, b), pa]);
    }
    encode_png(&DynamicImage::ImageRgba8(canvas))
        .map_err(|err| GenerationFailure::transport(format!("{err:#}")))
}

fn blend(base: u8, tint: u8) -> u8 {
    let mixed = base as f32 * (1.0 - TINT_WEIGHT) + tint as f32 * TINT_WEIGHT;
    mixed.round().clamp(0.0, 255.0) as u8
}

fn color_from_instruction(instruction: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(instruction.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};
    use kitfusion_contracts::errors::GenerationFailure;
    use kitfusion_contracts::media::ImagePayload;

    use super::DryrunClient;
    use crate::client::{FusionRequest, GenerationClient};
    use crate::media::{decode_payload_image, encode_png, payload_from_bytes};

    fn photo() -> anyhow::Result<ImagePayload> {
        let image = RgbImage::from_pixel(6, 4, Rgb([120, 120, 120]));
        let png = encode_png(&DynamicImage::ImageRgb8(image))?;
        Ok(payload_from_bytes(&png, "image/png"))
    }

    fn request(instruction: &str) -> anyhow::Result<FusionRequest> {
        Ok(FusionRequest {
            person: photo()?,
            garment: photo()?,
            instruction: instruction.to_string(),
        })
    }

    #[test]
    fn returns_png_at_person_resolution() -> anyhow::Result<()> {
        let response = DryrunClient.fuse(&request("orange kit")?)?;
        assert_eq!(response.image.mime(), "image/png");
        let decoded = decode_payload_image(&response.image)?;
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
        assert_eq!(response.provider_request["endpoint"], "dryrun-native");
        Ok(())
    }

    #[test]
    fn same_instruction_same_bytes() -> anyhow::Result<()> {
        let first = DryrunClient.fuse(&request("orange kit")?)?;
        let second = DryrunClient.fuse(&request("orange kit")?)?;
        let other = DryrunClient.fuse(&request("white kit")?)?;
        assert_eq!(first.image, second.image);
        assert_ne!(first.image, other.image);
        Ok(())
    }

    #[test]
    fn refuse_marker_yields_service_refusal() -> anyhow::Result<()> {
        let err = DryrunClient
            .fuse(&request("please [refuse] this")?)
            .err()
            .expect("refused");
        assert_eq!(
            err,
            GenerationFailure::ServiceRefusal(
                "The dryrun client declined this request.".to_string()
            )
        );
        Ok(())
    }

    #[test]
    fn undecodable_person_is_a_transport_failure() -> anyhow::Result<()> {
        let mut broken = request("kit")?;
        broken.person = ImagePayload::new("bm90LWFuLWltYWdl", "image/jpeg");
        let err = DryrunClient.fuse(&broken).err().expect("decode fails");
        assert_eq!(err.kind(), "transport");
        Ok(())
    }
}
