//! Prompt templates sent to the image model.

/// Caption placed before the portrait image.
pub const PORTRAIT_CAPTION: &str = "Main portrait (the person to restyle):";
/// Caption placed before the vibe image.
pub const VIBE_CAPTION: &str = "Overall vibe reference (mood, palette, lighting):";

pub fn element_caption(position: usize) -> String {
    format!("Style element {position} (an item or look to apply):")
}

/// Instruction closing a full makeover request.
///
/// The images are sent before this text, each preceded by its caption.
pub fn makeover_prompt(element_count: usize, has_vibe: bool) -> String {
    let mut prompt = String::from(
        "You are a professional stylist and photo retoucher. Create a single photorealistic \
         image of the person in the main portrait wearing a complete new look.\n",
    );

    if element_count > 0 {
        prompt.push_str(&format!(
            "Incorporate all {element_count} style element image(s): clothing, accessories, \
             hair or makeup shown there should appear on the person, adapted naturally to \
             their pose and body.\n"
        ));
    }
    if has_vibe {
        prompt.push_str(
            "Match the overall vibe reference in mood, color palette, lighting and \
             background, without copying the person shown in it.\n",
        );
    }

    prompt.push_str(
        "Keep the person's face, identity, skin tone and expression unchanged. \
         Return only the edited image.",
    );
    prompt
}

/// Instruction for editing a previously generated image.
pub fn adjustment_prompt(instruction: &str) -> String {
    format!(
        "Edit this image according to the following request, changing nothing else. \
         Keep the person's face and identity unchanged and keep the result photorealistic.\n\
         Request: {instruction}\n\
         Return only the edited image."
    )
}
