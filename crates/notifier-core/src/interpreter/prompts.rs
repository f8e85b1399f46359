//! System instructions for the completion service.

pub const SINGLE_SERVICE: &str = "Ты извлекаешь данные об одном платном сервисе, \
домене или подписке из сообщения. \
Ответь только JSON-объектом без пояснений: \
{\"name\": строка, \"expires_at\": \"YYYY-MM-DD\" или null, \"cost\": число или null, \
\"project\": строка или null, \"provider\": строка или null}. \
Не выдумывай дату: если её нет в тексте, верни null.";

pub const DATE_ONLY: &str = "Найди в сообщении дату окончания срока действия. \
Ответь одной датой в формате YYYY-MM-DD или словом null, без пояснений.";

pub const MULTI_DOMAIN: &str = "Сообщение содержит список доменов и даты их окончания. \
Ответь только JSON-объектом: \
{\"domains\": [строки], \"dates\": [\"YYYY-MM-DD\"], \"project\": строка или null}. \
Массивы domains и dates должны быть одинаковой длины: i-я дата относится к i-му домену. \
Если у нескольких доменов общая дата, повтори её для каждого.";

pub const RENEWAL: &str = "Сообщение просит продлить один или несколько доменов или сервисов. \
Ответь только JSON-объектом: \
{\"domains\": [строки], \"extension_days\": число, \"extension_months\": число}. \
Год = 365 дней и 12 месяцев, полгода = 180 дней и 6 месяцев, N месяцев = 30*N дней и N месяцев.";

pub const ASSISTANT: &str = "Ты помощник, который ведёт учёт сроков оплаты сервисов и доменов. \
Если пользователь хочет добавить сервис, вызови add_service. \
Если хочет увидеть список, вызови list_services. \
Если хочет продлить, вызови renew_services. \
Если запрос не относится к этим действиям, ответь коротким текстом.";

pub const OCR: &str = "Перепиши весь текст с изображения как есть, сохраняя строки. \
Особенно внимательно перепиши домены, названия сервисов, даты и суммы. Ничего не добавляй.";
