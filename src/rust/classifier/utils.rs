use ndarray::Array1;

pub(crate) fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    if logits.is_empty() {
        return Array1::zeros(0);
    }
    let max = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exp = logits.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    if sum > 1e-10 {
        exp / sum
    } else {
        Array1::zeros(logits.len())
    }
}

pub(crate) fn sigmoid(logits: &Array1<f32>) -> Array1<f32> {
    logits.mapv(|x| 1.0 / (1.0 + (-x).exp()))
}
