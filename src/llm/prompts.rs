//! Improvement prompt constants.
//!
//! These are the behavioral contract sent to the completion model: fix OCR
//! and grammar errors, keep the author's meaning, tone and facts intact, and
//! return only the rewritten text. The client cannot verify compliance — it
//! treats the returned string as opaque.

pub const IMPROVE_MODEL: &str = "gpt-4o-mini";
pub const IMPROVE_MAX_TOKENS: u32 = 2000;
pub const IMPROVE_TEMPERATURE: f32 = 0.3;

pub const IMPROVE_SYSTEM_PROMPT: &str = r#"Eres un asistente especializado en mejorar textos extraídos por OCR de escritura manuscrita en español. Tu tarea es:

1. Corregir errores ortográficos y gramaticales
2. Mejorar la puntuación y formato
3. Mantener el significado y tono original
4. Estructurar el texto de manera clara y legible
5. Conservar todas las ideas y contenido original

Reglas importantes:
- NO agregues contenido nuevo que no esté en el texto original
- NO cambies el sentido o significado del texto
- NO elimines información importante
- Mantén el estilo personal del autor
- Si el texto contiene fechas, nombres o datos específicos, manténlos exactos
- Corrige solo errores evidentes de OCR (letras mal reconocidas, palabras cortadas, etc.)

Devuelve únicamente el texto mejorado, sin explicaciones adicionales."#;

/// User message wrapping the text to improve.
pub fn build_improve_message(text: &str) -> String {
    format!("Por favor, mejora este texto extraído por OCR manteniéndolo fiel al original:\n\n{text}")
}
