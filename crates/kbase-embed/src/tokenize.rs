use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Pad id used by XLM-RoBERTa tokenizers.
const PAD_ID: u32 = 1;

/// Truncate or pad ids and attention mask to exactly `max_len` positions.
fn fit_to_length(mut ids: Vec<u32>, mut mask: Vec<u32>, max_len: usize) -> (Vec<u32>, Vec<u32>) {
    if ids.len() > max_len {
        tracing::debug!(tokens = ids.len(), max_len, "query truncated to model context");
        ids.truncate(max_len);
        mask.truncate(max_len);
    }
    let pad = max_len - ids.len();
    ids.extend(std::iter::repeat(PAD_ID).take(pad));
    mask.extend(std::iter::repeat(0).take(pad));
    (ids, mask)
}

pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let (ids, mask) = fit_to_length(enc.get_ids().to_vec(), enc.get_attention_mask().to_vec(), max_len);
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, max_len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, max_len))?;
    Ok((input_ids, attention_mask))
}
